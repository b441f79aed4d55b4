//! Copy a single input to the target

use super::{BuildContext, Tech, tech_identity};
use crate::config::OptionMap;
use crate::error::TechError;
use async_trait::async_trait;

/// Publishes the content of exactly one input under the target name.
#[derive(Debug, Clone)]
pub struct CopyTech {
    identity: String,
}

impl CopyTech {
    /// Configuration name
    pub const NAME: &'static str = "copy";

    /// Build from options (none are interpreted).
    #[must_use]
    pub fn from_options(options: &OptionMap) -> Self {
        Self {
            identity: tech_identity(Self::NAME, options),
        }
    }
}

impl Default for CopyTech {
    fn default() -> Self {
        Self::from_options(&OptionMap::new())
    }
}

#[async_trait]
impl Tech for CopyTech {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> Result<(), TechError> {
        let inputs: Vec<_> = ctx.inputs().collect();
        let [input] = inputs.as_slice() else {
            return Err(TechError::Failed(format!(
                "copy expects exactly one input for {}, got {}",
                ctx.target(),
                inputs.len()
            )));
        };
        let content = ctx.read(input).await?;
        let _ = ctx.write_target(&content).await?;
        Ok(())
    }
}
