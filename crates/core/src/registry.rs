use crate::{error::ToolError, tool::ToolHandler};
use gemini_realtime::{FunctionDeclaration, ToolGroup};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Catalog of the functions answered locally.
///
/// Built once at startup and then shared read-only. Declarations are kept in
/// registration order because that is the order advertised to the model.
#[derive(Default)]
pub struct ToolRegistry {
    declarations: Vec<FunctionDeclaration>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one declaration answered by `handler`.
    ///
    /// A name that is already registered is overwritten: the new declaration
    /// takes the old one's place in the advertised order and the new handler
    /// replaces the old one.
    pub fn register(
        &mut self,
        declaration: FunctionDeclaration,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), ToolError> {
        declaration.validate()?;

        let name = declaration.name.clone();
        match self.declarations.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                warn!(tool = %name, "Tool registered twice; replacing the earlier registration.");
                *existing = declaration;
            }
            None => self.declarations.push(declaration),
        }
        self.handlers.insert(name.clone(), handler);
        info!(tool = %name, "Registered tool.");
        Ok(())
    }

    /// Registers every declaration `handler` exposes.
    ///
    /// Declarations are validated up front so a handler is never left
    /// half-registered.
    pub fn register_handler(&mut self, handler: impl ToolHandler + 'static) -> Result<(), ToolError> {
        let declarations = handler.declarations();
        for declaration in &declarations {
            declaration.validate()?;
        }
        let handler: Arc<dyn ToolHandler> = Arc::new(handler);
        for declaration in declarations {
            self.register(declaration, handler.clone())?;
        }
        Ok(())
    }

    /// All declarations, in registration order, as the single group the
    /// protocol expects.
    pub fn declarations(&self) -> ToolGroup {
        ToolGroup {
            function_declarations: self.declarations.clone(),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ToolHandler>, ToolError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
