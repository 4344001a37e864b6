//! Default database switch

use crate::context::ContextManager;
use crate::error::DatabaseError;
use crate::tools::Tool;
use crate::types::{ChangeDatabaseArgs, ChangeDatabaseOutput, ToolOutcome};
use std::sync::Arc;

#[derive(Clone)]
pub struct ChangeDatabaseTool {
    contexts: Arc<ContextManager>,
}

impl ChangeDatabaseTool {
    pub fn new(contexts: Arc<ContextManager>) -> Self {
        Self { contexts }
    }

    async fn run(&self, args: &ChangeDatabaseArgs) -> Result<ChangeDatabaseOutput, DatabaseError> {
        let database = args.database.trim();
        let previous_database = self.contexts.change_default(database).await?;

        Ok(ChangeDatabaseOutput {
            success: true,
            message: format!("Switched default database to {}", database),
            previous_database,
            database: database.to_string(),
        })
    }
}

impl Tool for ChangeDatabaseTool {
    type Args = ChangeDatabaseArgs;
    type Output = ChangeDatabaseOutput;
    type Echo = ChangeDatabaseArgs;

    fn name() -> &'static str {
        "change_database"
    }

    fn read_only() -> bool {
        false
    }

    async fn execute(
        &self,
        args: ChangeDatabaseArgs,
    ) -> ToolOutcome<ChangeDatabaseOutput, ChangeDatabaseArgs> {
        match self.run(&args).await {
            Ok(output) => ToolOutcome::Success(output),
            Err(e) => {
                log::error!("{} failed: {}", Self::name(), e);
                ToolOutcome::failure(&e, args)
            }
        }
    }
}
