use crate::editor::DeclarationEditor;
use crate::error::Result;
use crate::tool::BuildTool;
use buckify_indexer::{ArchiveArtifact, ArchiveFormat, GeneratedClass, GeneratedClassSource};
use buckify_protocol::{BuildTarget, RuleType};

/// Inputs of the class index as declared in the project
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub archives: Vec<ArchiveArtifact>,
    pub generated: Vec<GeneratedClassSource>,
    /// Prebuilt targets that could not be built or located
    pub skipped: Vec<BuildTarget>,
}

/// Collects prebuilt archives and class generating rules through the build tool
pub struct InventoryCollector<'a> {
    tool: &'a dyn BuildTool,
    editor: &'a DeclarationEditor,
}

impl<'a> InventoryCollector<'a> {
    pub fn new(tool: &'a dyn BuildTool, editor: &'a DeclarationEditor) -> Self {
        Self { tool, editor }
    }

    pub fn collect(&self) -> Result<Inventory> {
        let mut inventory = Inventory::default();

        for (rule_type, format) in [
            (RuleType::PrebuiltJar, ArchiveFormat::Jar),
            (RuleType::AndroidPrebuiltAar, ArchiveFormat::Aar),
        ] {
            for target in self.tool.targets_of_type(&[rule_type])? {
                match self.built_archive(&target, format)? {
                    Some(archive) => inventory.archives.push(archive),
                    None => inventory.skipped.push(target),
                }
            }
        }

        for (rule_type, class) in [
            (RuleType::AndroidBuildConfig, GeneratedClass::BuildConfig),
            (RuleType::AndroidResource, GeneratedClass::Resource),
        ] {
            for target in self.tool.targets_of_type(&[rule_type])? {
                match self.editor.attribute(&target, "package")? {
                    Some(package) => inventory.generated.push(GeneratedClassSource {
                        target,
                        package,
                        class,
                    }),
                    None => log::warn!("{target} declares no package, skipping"),
                }
            }
        }

        log::info!(
            "Inventory: {} archives, {} generating rules, {} skipped",
            inventory.archives.len(),
            inventory.generated.len(),
            inventory.skipped.len()
        );
        Ok(inventory)
    }

    fn built_archive(
        &self,
        target: &BuildTarget,
        format: ArchiveFormat,
    ) -> Result<Option<ArchiveArtifact>> {
        let output = self.tool.build(target)?;
        if !output.success {
            log::warn!("Could not build {target}: {}", output.stderr.trim());
            return Ok(None);
        }
        let Some(path) = self.tool.output_path(target)? else {
            log::warn!("No output reported for {target}");
            return Ok(None);
        };
        Ok(Some(ArchiveArtifact {
            target: target.clone(),
            path,
            format,
        }))
    }
}
