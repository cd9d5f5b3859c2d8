//! Control API Route Table
//!
//! Maps logical operations to versioned path templates of the cluster's
//! control API.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Placeholder for the cluster fsid in route patterns
pub const CLUSTER_FSID_TOKEN: &str = "{cluster-fsid}";

/// Placeholder for an async request id in route patterns
pub const REQUEST_FSID_TOKEN: &str = "{request-fsid}";

pub const CREATE_POOL: &str = "CreatePool";
pub const GET_REQUEST_STATUS: &str = "GetRequestStatus";

/// HTTP method of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMethod {
    Get,
    Post,
}

impl std::fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteMethod::Get => write!(f, "GET"),
            RouteMethod::Post => write!(f, "POST"),
        }
    }
}

/// One templated endpoint of the control API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CephApiRoute {
    pub name: &'static str,
    pub method: RouteMethod,
    pub pattern: &'static str,
    pub version: u32,
}

impl CephApiRoute {
    /// Substitute placeholder tokens, URL-encoding each value.
    ///
    /// Fails if any `{...}` placeholder is left over.
    pub fn render(&self, substitutions: &[(&str, &str)]) -> Result<String> {
        let path = substitutions
            .iter()
            .fold(self.pattern.to_string(), |path, (token, value)| {
                path.replacen(token, &urlencoding::encode(value), 1)
            });

        if path.contains('{') {
            return Err(Error::Internal(format!(
                "Unresolved placeholder in route {}: {}",
                self.name, path
            )));
        }

        debug!("Rendered route {}: {} {}", self.name, self.method, path);
        Ok(path)
    }
}

/// Immutable set of routes known to the client
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: BTreeMap<&'static str, CephApiRoute>,
}

impl RouteTable {
    pub fn new(routes: impl IntoIterator<Item = CephApiRoute>) -> Self {
        Self {
            routes: routes.into_iter().map(|r| (r.name, r)).collect(),
        }
    }

    /// Look up a route by operation name
    pub fn get(&self, name: &str) -> Result<&CephApiRoute> {
        self.routes
            .get(name)
            .ok_or_else(|| Error::Internal(format!("No control API route for {}", name)))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new([
            CephApiRoute {
                name: CREATE_POOL,
                method: RouteMethod::Post,
                pattern: "cluster/{cluster-fsid}/pool",
                version: 2,
            },
            CephApiRoute {
                name: GET_REQUEST_STATUS,
                method: RouteMethod::Get,
                pattern: "request/{request-fsid}",
                version: 2,
            },
        ])
    }
}
