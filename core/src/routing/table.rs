//! Static route table
//!
//! The route source is a shared text file with one route per line:
//!
//! ```text
//! nodeId destination nextHop nextHopProtocol
//! ```
//!
//! `nextHopProtocol` is `1` for Wifi and `2` for Zigbee. The source is parsed once
//! per model; each node then keeps only the lines tagged with its own id.

use crate::transport::Protocol;
use crate::NodeId;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Static next-hop record for one destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub destination: NodeId,
    pub next_hop: NodeId,
    /// Protocol the next hop must be reached with
    pub next_hop_protocol: Protocol,
}

/// Errors while reading the route source
#[derive(Debug, Error)]
pub enum RouteSourceError {
    #[error("line {line}: expected `node destination next_hop protocol`, got {content:?}")]
    Malformed { line: usize, content: String },

    #[error("line {line}: unknown next-hop protocol code {code}")]
    UnknownProtocol { line: usize, code: i64 },

    #[error("line {line}: node {node} already has a route to {destination}")]
    DuplicateRoute {
        line: usize,
        node: NodeId,
        destination: NodeId,
    },

    #[error("cannot read route source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One parsed line of the route source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    /// Node whose table this line belongs to
    pub node: NodeId,
    pub route: Route,
    /// 1-based line number, kept for diagnostics
    pub line: usize,
}

/// The parsed route source, shared read-only by every node of a model
#[derive(Debug, Clone, Default)]
pub struct RouteSource {
    entries: Vec<RouteEntry>,
}

impl RouteSource {
    /// Parse route lines. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, RouteSourceError> {
        let mut entries = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }

            let fields: Vec<i64> = content
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|_| RouteSourceError::Malformed {
                    line,
                    content: content.to_string(),
                })?;

            let [node, destination, next_hop, code] = fields[..] else {
                return Err(RouteSourceError::Malformed {
                    line,
                    content: content.to_string(),
                });
            };

            let ids = [node, destination, next_hop].map(NodeId::try_from);
            let [Ok(node), Ok(destination), Ok(next_hop)] = ids else {
                return Err(RouteSourceError::Malformed {
                    line,
                    content: content.to_string(),
                });
            };

            let next_hop_protocol = Protocol::from_route_code(code)
                .ok_or(RouteSourceError::UnknownProtocol { line, code })?;

            entries.push(RouteEntry {
                node,
                route: Route {
                    destination,
                    next_hop,
                    next_hop_protocol,
                },
                line,
            });
        }

        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, RouteSourceError> {
        let text = std::fs::read_to_string(path).map_err(|source| RouteSourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Distinct node ids that own at least one route, in ascending order
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.entries.iter().map(|e| e.node).collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Build the route table of `node` from the lines tagged with its id
    pub fn table_for(&self, node: NodeId) -> Result<RouteTable, RouteSourceError> {
        let mut routes = HashMap::new();

        for entry in self.entries.iter().filter(|e| e.node == node) {
            if routes.insert(entry.route.destination, entry.route).is_some() {
                return Err(RouteSourceError::DuplicateRoute {
                    line: entry.line,
                    node,
                    destination: entry.route.destination,
                });
            }
        }

        Ok(RouteTable { routes })
    }
}

/// Per-node mapping from destination to next hop; read-only once built
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: HashMap<NodeId, Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route to `destination`; `None` is an ordinary outcome, not a fault
    pub fn lookup(&self, destination: NodeId) -> Option<&Route> {
        self.routes.get(&destination)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes ordered by destination
    pub fn routes(&self) -> Vec<&Route> {
        let mut routes: Vec<&Route> = self.routes.values().collect();
        routes.sort_by_key(|r| r.destination);
        routes
    }
}

impl FromIterator<Route> for RouteTable {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().map(|r| (r.destination, r)).collect(),
        }
    }
}
