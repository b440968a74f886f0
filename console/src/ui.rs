//! Interactive selection prompts. The pipeline only ever sees the resolved
//! assembly and sample list, never which prompter produced them.

use std::path::PathBuf;

use anyhow::{bail, Result};
use console::style;
use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::{Confirm, Input, MultiSelect, Select};
use methfetch::data_structs::{Assembly, SampleId, SampleTree};

const WELCOME: &str = "\
It downloads methylation data from the NGSmethDB programmatically. You only
need to select an assembly, samples of interest and a BED file with genomic
regions to consult.

If you save the configuration file, later runs can query data without the
program asking anything.";

/// Source of the interactive assembly/sample selection.
pub trait Prompter {
    fn welcome(&self) -> Result<()>;
    fn choose_assembly(&self, assemblies: &[Assembly]) -> Result<String>;
    fn choose_samples(&self, tree: &SampleTree) -> Result<Vec<SampleId>>;
    /// Where to save the selection, or `None` to skip saving.
    fn config_save_path(&self) -> Result<Option<PathBuf>>;
}

/// Styled prompts for capable terminals.
pub struct ColorPrompter {
    theme: ColorfulTheme,
}

/// Prompts without colors or cursor movement, for dumb terminals and logs.
pub struct PlainPrompter {
    theme: SimpleTheme,
}

pub fn prompter(plain: bool) -> Box<dyn Prompter> {
    if plain {
        Box::new(PlainPrompter { theme: SimpleTheme })
    }
    else {
        Box::new(ColorPrompter {
            theme: ColorfulTheme::default(),
        })
    }
}

impl Prompter for ColorPrompter {
    fn welcome(&self) -> Result<()> {
        println!("{}\n\n{WELCOME}\n", style("Welcome to the NGSmethDB client!").bold());
        Ok(())
    }

    fn choose_assembly(&self, assemblies: &[Assembly]) -> Result<String> {
        pick_assembly(&self.theme, assemblies)
    }

    fn choose_samples(&self, tree: &SampleTree) -> Result<Vec<SampleId>> {
        pick_samples(&self.theme, tree)
    }

    fn config_save_path(&self) -> Result<Option<PathBuf>> {
        pick_config_path(&self.theme)
    }
}

impl Prompter for PlainPrompter {
    fn welcome(&self) -> Result<()> {
        println!("Welcome to the NGSmethDB client!\n\n{WELCOME}\n");
        Ok(())
    }

    fn choose_assembly(&self, assemblies: &[Assembly]) -> Result<String> {
        pick_assembly(&self.theme, assemblies)
    }

    fn choose_samples(&self, tree: &SampleTree) -> Result<Vec<SampleId>> {
        pick_samples(&self.theme, tree)
    }

    fn config_save_path(&self) -> Result<Option<PathBuf>> {
        pick_config_path(&self.theme)
    }
}

fn pick_assembly(theme: &dyn Theme, assemblies: &[Assembly]) -> Result<String> {
    if assemblies.is_empty() {
        bail!("the server lists no assemblies");
    }
    let items = assemblies
        .iter()
        .map(|a| format!("{} {} ({})", a.assembly, a.common, a.species))
        .collect::<Vec<_>>();
    let chosen = Select::with_theme(theme)
        .with_prompt("Select an assembly from the list below")
        .items(&items)
        .default(0)
        .interact_opt()?;
    let Some(index) = chosen else {
        bail!("assembly not selected");
    };
    Ok(assemblies[index].assembly.clone())
}

fn pick_samples(theme: &dyn Theme, tree: &SampleTree) -> Result<Vec<SampleId>> {
    let ids = tree
        .iter()
        .flat_map(|(individual, samples)| {
            let mut sorted = samples.clone();
            sorted.sort();
            sorted
                .into_iter()
                .map(move |sample| SampleId::new(individual.clone(), sample))
        })
        .collect::<Vec<_>>();
    if ids.is_empty() {
        bail!("no samples available for this assembly");
    }

    let labels = ids
        .iter()
        .map(|id| format!("{} {}", id.individual(), id.sample()))
        .collect::<Vec<_>>();
    let chosen = MultiSelect::with_theme(theme)
        .with_prompt("Select one or more samples from the list below")
        .items(&labels)
        .interact_opt()?;
    let Some(chosen) = chosen.filter(|indices| !indices.is_empty()) else {
        bail!("sample(s) not selected");
    };
    Ok(chosen.into_iter().map(|index| ids[index].clone()).collect())
}

fn pick_config_path(theme: &dyn Theme) -> Result<Option<PathBuf>> {
    let save = Confirm::with_theme(theme)
        .with_prompt("Save the selection as a configuration file?")
        .default(true)
        .interact_opt()?
        .unwrap_or(false);
    if !save {
        return Ok(None);
    }
    let path: String = Input::with_theme(theme)
        .with_prompt("Where to save the configuration file?")
        .default("config.json".to_string())
        .interact_text()?;
    Ok(Some(PathBuf::from(path)))
}
