//! Asset manifest listing inputs by node-relative path and public URL

use super::{BuildContext, Tech, tech_identity};
use crate::config::OptionMap;
use crate::error::TechError;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Serialize)]
struct ManifestEntry {
    path: String,
    url: String,
}

/// Writes a JSON array describing every input: its path relative to the
/// node (`./` inside the node, `../` otherwise) and its URL under the
/// configured www root.
#[derive(Debug, Clone)]
pub struct ManifestTech {
    identity: String,
}

impl ManifestTech {
    /// Configuration name
    pub const NAME: &'static str = "manifest";

    /// Build from options (none are interpreted).
    #[must_use]
    pub fn from_options(options: &OptionMap) -> Self {
        Self {
            identity: tech_identity(Self::NAME, options),
        }
    }
}

impl Default for ManifestTech {
    fn default() -> Self {
        Self::from_options(&OptionMap::new())
    }
}

#[async_trait]
impl Tech for ManifestTech {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn output_identity(&self, www_root: &str) -> String {
        format!("{}@{}", self.identity, www_root)
    }

    async fn build(&self, ctx: &BuildContext<'_>) -> Result<(), TechError> {
        let node = ctx.node();
        let entries: Vec<ManifestEntry> = ctx
            .inputs()
            .map(|input| ManifestEntry {
                path: node.relative_path(input),
                url: node.www_root_path(input, Some(ctx.www_root())),
            })
            .collect();

        let json = serde_json::to_vec_pretty(&entries)
            .map_err(|e| TechError::Failed(format!("cannot encode manifest: {e}")))?;
        let _ = ctx.write_target(&json).await?;
        Ok(())
    }
}
