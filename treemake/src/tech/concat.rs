//! Concatenate sources and dependency targets into one file

use super::{BuildContext, Tech, string_option, tech_identity};
use crate::config::OptionMap;
use crate::error::{ConfigError, TechError};
use async_trait::async_trait;

/// Joins every input, sources first, with a separator (newline by default).
#[derive(Debug, Clone)]
pub struct ConcatTech {
    separator: String,
    identity: String,
}

impl ConcatTech {
    /// Configuration name
    pub const NAME: &'static str = "concat";

    /// Build from the `separator` option.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidOption` if `separator` is not a string.
    pub fn from_options(options: &OptionMap) -> Result<Self, ConfigError> {
        Ok(Self {
            separator: string_option(Self::NAME, options, "separator")?
                .unwrap_or_else(|| "\n".to_string()),
            identity: tech_identity(Self::NAME, options),
        })
    }
}

impl Default for ConcatTech {
    fn default() -> Self {
        Self {
            separator: "\n".to_string(),
            identity: tech_identity(Self::NAME, &OptionMap::new()),
        }
    }
}

#[async_trait]
impl Tech for ConcatTech {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> Result<(), TechError> {
        let mut output = Vec::new();
        for (i, input) in ctx.inputs().enumerate() {
            if i > 0 {
                output.extend_from_slice(self.separator.as_bytes());
            }
            output.extend(ctx.read(input).await?);
        }
        let _ = ctx.write_target(&output).await?;
        Ok(())
    }
}
