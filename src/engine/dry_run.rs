use super::{ApplyResult, EngineError, EngineHandle, ProvisioningEngine};
use crate::models::ResourceNode;

/// Engine that provisions nothing. It records declarations and links, and checks
/// that every link points from an earlier declaration to a later one.
#[derive(Debug, Default)]
pub struct DryRunEngine {
    declared: Vec<ResourceNode>,
    links: Vec<(EngineHandle, EngineHandle)>,
    committed: bool,
}

impl DryRunEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes in declaration order.
    pub fn declared(&self) -> &[ResourceNode] {
        &self.declared
    }

    pub fn links(&self) -> &[(EngineHandle, EngineHandle)] {
        &self.links
    }

    pub fn handle_of(&self, name: &str) -> Option<EngineHandle> {
        // Subnet names repeat across regions; the last declaration wins.
        self.declared
            .iter()
            .rposition(|n| n.name == name)
            .map(|i| EngineHandle(i as u64))
    }

    /// Handles linked into `handle`.
    pub fn dependencies(&self, handle: EngineHandle) -> Vec<EngineHandle> {
        self.links
            .iter()
            .filter(|(_, to)| *to == handle)
            .map(|(from, _)| *from)
            .collect()
    }

    fn check(&self, handle: EngineHandle) -> Result<(), EngineError> {
        if (handle.0 as usize) < self.declared.len() {
            Ok(())
        } else {
            Err(EngineError::new(format!("unknown engine handle {}", handle.0)))
        }
    }
}

impl ProvisioningEngine for DryRunEngine {
    fn declare(&mut self, node: &ResourceNode) -> Result<EngineHandle, EngineError> {
        if self.committed {
            return Err(EngineError::new("engine already committed"));
        }
        log::debug!("declare {node}");
        self.declared.push(node.clone());
        Ok(EngineHandle(self.declared.len() as u64 - 1))
    }

    fn link(&mut self, from: EngineHandle, to: EngineHandle) -> Result<(), EngineError> {
        self.check(from)?;
        self.check(to)?;
        if from >= to {
            return Err(EngineError::new(format!(
                "{} must be declared before {}",
                self.declared[from.0 as usize].name, self.declared[to.0 as usize].name
            )));
        }
        self.links.push((from, to));
        Ok(())
    }

    fn commit(&mut self) -> Result<ApplyResult, EngineError> {
        if self.committed {
            return Err(EngineError::new("engine already committed"));
        }
        self.committed = true;
        let mut result = ApplyResult::new();
        for node in &self.declared {
            let message = if node.protected {
                format!("would create {} (protected)", node.kind)
            } else {
                format!("would create {}", node.kind)
            };
            result.add_success(node, message);
        }
        Ok(result)
    }
}
