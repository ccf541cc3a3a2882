//! Dependency graph declaration and validation
//!
//! Services reference their dependencies by value, so a graph built through
//! `ServiceBase::new` is acyclic by construction. Graphs declared by name
//! (e.g. from configuration) go through `ServiceGraph`, which rejects
//! unknown targets and cycles and yields a dependency-first construction
//! order.

use crate::{Dependency, DependencyFlags, GraphError, ServiceBase, ServiceLogic, ServicesMonitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A service declared by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `(target name, flags)` in declaration order
    #[serde(default)]
    pub dependencies: Vec<(String, DependencyFlags)>,
}

impl ServiceDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn depends_on(mut self, target: impl Into<String>, flags: DependencyFlags) -> Self {
        self.dependencies.push((target.into(), flags));
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    InProgress,
    Done,
}

/// Named service declarations forming a dependency graph
#[derive(Debug, Clone, Default)]
pub struct ServiceGraph {
    declarations: Vec<ServiceDeclaration>,
}

impl ServiceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, declaration: ServiceDeclaration) -> &mut Self {
        self.declarations.push(declaration);
        self
    }

    pub fn declarations(&self) -> &[ServiceDeclaration] {
        &self.declarations
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        self.plan().map(|_| ())
    }

    /// Construction order with every dependency before its owners
    ///
    /// Stable: independent services keep their declaration order.
    pub fn plan(&self) -> Result<Vec<&ServiceDeclaration>, GraphError> {
        let mut index = HashMap::with_capacity(self.declarations.len());
        for (i, declaration) in self.declarations.iter().enumerate() {
            if index.insert(declaration.name.as_str(), i).is_some() {
                return Err(GraphError::DuplicateName(declaration.name.clone()));
            }
        }

        let mut edges = Vec::with_capacity(self.declarations.len());
        for declaration in &self.declarations {
            let mut targets = Vec::with_capacity(declaration.dependencies.len());
            for (target, _) in &declaration.dependencies {
                if *target == declaration.name {
                    return Err(GraphError::SelfDependency(declaration.name.clone()));
                }
                let Some(&i) = index.get(target.as_str()) else {
                    return Err(GraphError::UnknownTarget {
                        owner: declaration.name.clone(),
                        target: target.clone(),
                    });
                };
                targets.push(i);
            }
            edges.push(targets);
        }

        let mut marks = vec![Mark::New; self.declarations.len()];
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(self.declarations.len());
        for i in 0..self.declarations.len() {
            self.visit(i, &edges, &mut marks, &mut stack, &mut order)?;
        }
        Ok(order.into_iter().map(|i| &self.declarations[i]).collect())
    }

    fn visit(
        &self,
        node: usize,
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), GraphError> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = stack.iter().position(|&n| n == node).unwrap_or(0);
                let mut path: Vec<String> = stack[start..]
                    .iter()
                    .map(|&n| self.declarations[n].name.clone())
                    .collect();
                path.push(self.declarations[node].name.clone());
                return Err(GraphError::Cycle { path });
            }
            Mark::New => {}
        }

        marks[node] = Mark::InProgress;
        stack.push(node);
        for &target in &edges[node] {
            self.visit(target, edges, marks, stack, order)?;
        }
        stack.pop();
        marks[node] = Mark::Done;
        order.push(node);
        Ok(())
    }

    /// Construct every declared service, dependencies first
    ///
    /// `factory` supplies each service's own logic. Returns the services in
    /// construction order.
    pub fn build<L, F>(
        &self,
        monitor: &Arc<ServicesMonitor>,
        mut factory: F,
    ) -> Result<Vec<Arc<ServiceBase<L>>>, GraphError>
    where
        L: ServiceLogic,
        F: FnMut(&ServiceDeclaration) -> L,
    {
        let plan = self.plan()?;
        let mut built: HashMap<&str, Arc<ServiceBase<L>>> = HashMap::with_capacity(plan.len());
        let mut ordered = Vec::with_capacity(plan.len());

        for declaration in plan {
            let dependencies = declaration
                .dependencies
                .iter()
                .map(|(target, flags)| {
                    // plan() guarantees targets are built before their owners
                    let service = built[target.as_str()].clone();
                    Dependency::new(service, *flags)
                })
                .collect();
            let service = ServiceBase::new(monitor, factory(declaration), dependencies)?;
            debug!(service = %declaration.name, "Built service from declaration");
            built.insert(declaration.name.as_str(), service.clone());
            ordered.push(service);
        }
        Ok(ordered)
    }
}
