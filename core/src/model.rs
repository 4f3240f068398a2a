// Routing model — per-simulation factory for node routing engines
//
// Holds what every node of one configuration shares (link budget and parsed route
// source) and brings nodes up from it.

use crate::config::{ConfigError, LinkBudget, ModelConfig, NodeParams};
use crate::routing::{ForwardingEngine, RouteSource};
use crate::transport::LinkLayer;
use crate::NodeId;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct RoutingModel {
    budget: Arc<LinkBudget>,
    source: Arc<RouteSource>,
}

impl RoutingModel {
    pub fn new(budget: LinkBudget, source: RouteSource) -> Result<Self, ConfigError> {
        budget.validate()?;
        Ok(Self {
            budget: Arc::new(budget),
            source: Arc::new(source),
        })
    }

    /// Load the route source named by `config`, resolving relative paths against `base_dir`
    pub fn from_config(config: &ModelConfig, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Path::new(&config.route_source_path);
        let path = match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };

        let source = RouteSource::load(&path)?;
        info!(
            "Loaded {} route(s) for {} node(s) from {}",
            source.entries().len(),
            source.nodes().len(),
            path.display()
        );
        Self::new(config.budget(), source)
    }

    pub fn budget(&self) -> &LinkBudget {
        &self.budget
    }

    pub fn source(&self) -> &RouteSource {
        &self.source
    }

    /// Node bring-up: build the node's table, bind its links and bootstrap the lanes
    pub fn build_node(
        &self,
        node_id: NodeId,
        params: NodeParams,
        links: Vec<Box<dyn LinkLayer>>,
    ) -> Result<ForwardingEngine, ConfigError> {
        let routes = self.source.table_for(node_id)?;
        let mut engine =
            ForwardingEngine::new(node_id, params, Arc::clone(&self.budget), routes, links)?;
        engine.bootstrap();

        info!(
            "Node {} up: {} capability, {} route(s)",
            node_id,
            params.capability,
            engine.routes().len()
        );
        Ok(engine)
    }
}
