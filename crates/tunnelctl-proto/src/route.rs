//! Routing intents: what hostname or load balancer forwards to a tunnel

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{is_valid_hostname, is_valid_name};

/// Errors raised while building a route from user input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("{0} is not a valid hostname")]
    InvalidHostname(String),

    #[error("{0} is not a valid load balancer name")]
    InvalidLbName(String),

    #[error("{0} is not a valid pool name")]
    InvalidPoolName(String),
}

/// A route binding a hostname or a load balancer pool to a tunnel.
///
/// The set of route kinds is closed; the directory matches on it
/// exhaustively when the route is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Route {
    /// CNAME from `hostname` to the tunnel
    Dns { hostname: String },
    /// Tunnel added as an origin of `pool` behind load balancer `lb_name`
    #[serde(rename = "lb")]
    LoadBalancer { lb_name: String, pool: String },
}

impl Route {
    /// Build a DNS route, validating the hostname first
    pub fn dns(hostname: &str) -> Result<Self, RouteError> {
        if hostname.is_empty() || !is_valid_hostname(hostname) {
            return Err(RouteError::InvalidHostname(hostname.to_string()));
        }
        Ok(Route::Dns {
            hostname: hostname.to_string(),
        })
    }

    /// Build a load balancer route, validating both names
    pub fn load_balancer(lb_name: &str, pool: &str) -> Result<Self, RouteError> {
        if lb_name.is_empty() || !is_valid_name(lb_name) {
            return Err(RouteError::InvalidLbName(lb_name.to_string()));
        }
        if pool.is_empty() || !is_valid_name(pool) {
            return Err(RouteError::InvalidPoolName(pool.to_string()));
        }
        Ok(Route::LoadBalancer {
            lb_name: lb_name.to_string(),
            pool: pool.to_string(),
        })
    }

    /// Short type name, as typed on the command line
    pub fn kind(&self) -> &'static str {
        match self {
            Route::Dns { .. } => "dns",
            Route::LoadBalancer { .. } => "lb",
        }
    }
}

/// What the directory did with one part of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    Created,
    Updated,
    Unchanged,
}

/// Outcome of submitting a [`Route`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RouteResult {
    Dns {
        hostname: String,
        change: Change,
    },
    #[serde(rename = "lb")]
    LoadBalancer {
        lb_name: String,
        pool: String,
        lb_change: Change,
        pool_change: Change,
    },
}

impl RouteResult {
    /// Human-readable sentence describing what changed
    pub fn success_summary(&self) -> String {
        match self {
            RouteResult::Dns { hostname, change } => match change {
                Change::Created => format!(
                    "Added CNAME {} which will route to this tunnel",
                    hostname
                ),
                Change::Updated => format!("{} updated to route to your tunnel", hostname),
                Change::Unchanged => {
                    format!("{} is already configured to route to your tunnel", hostname)
                }
            },
            RouteResult::LoadBalancer {
                lb_name,
                pool,
                lb_change,
                pool_change,
            } => match (lb_change, pool_change) {
                (Change::Created, _) => format!(
                    "Created load balancer {} and added a new pool {} with this tunnel as an origin",
                    lb_name, pool
                ),
                (_, Change::Created) => format!(
                    "Added new pool {} with this tunnel as an origin to load balancer {}",
                    pool, lb_name
                ),
                (_, Change::Updated) => format!(
                    "Added this tunnel as an origin of existing pool {} of load balancer {}",
                    pool, lb_name
                ),
                (_, Change::Unchanged) => format!(
                    "Load balancer {} already uses pool {} which has this tunnel as an origin",
                    lb_name, pool
                ),
            },
        }
    }
}
