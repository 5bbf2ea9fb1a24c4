//! DIA-NN strategy.
//!
//! Every enumeration value maps to a fixed, possibly empty, list of flags.
//! Numeric fields at zero are treated as unset and emit nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::command::{decimal, CommandLine};
use super::script::render_job_script;
use super::{
    check_resolved, CompiledSearch, FileReferences, ResolvedPaths, SearchCompiler, SearchParameters,
};
use crate::config::{AppConfig, SchedulerConfig, SearchTool};
use crate::error::{Error, Result};
use crate::store::join;
use crate::workspace::ResourceSchema;

pub const REPORT_FILE: &str = "report.tsv";
const MAX_LOG_LEVEL: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProteinInference {
    #[default]
    #[serde(alias = "Genes")]
    Genes,
    #[serde(alias = "Isoform IDs")]
    IsoformIds,
    #[serde(alias = "Protein Names (from FASTA)")]
    ProteinNames,
    #[serde(alias = "Genes (Species-Specific)")]
    GenesSpeciesSpecific,
    #[serde(alias = "Off")]
    Off,
}

impl ProteinInference {
    pub fn flags(self) -> &'static [&'static str] {
        match self {
            ProteinInference::Genes => &[],
            ProteinInference::IsoformIds => &["--pg-level", "0"],
            ProteinInference::ProteinNames => &["--pg-level", "1"],
            ProteinInference::GenesSpeciesSpecific => &["--pg-level", "2", "--species-genes"],
            ProteinInference::Off => &["--no-prot-inf"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuralNetworkClassifier {
    #[default]
    #[serde(alias = "Single-Pass Mode")]
    SinglePass,
    #[serde(alias = "Double-Pass Mode")]
    DoublePass,
    #[serde(alias = "Off")]
    Off,
}

impl NeuralNetworkClassifier {
    pub fn flags(self) -> &'static [&'static str] {
        match self {
            NeuralNetworkClassifier::SinglePass => &[],
            NeuralNetworkClassifier::DoublePass => &["--double-search"],
            NeuralNetworkClassifier::Off => &["--no-nn"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantificationStrategy {
    #[default]
    #[serde(alias = "QuantUMS (high precision)")]
    QuantumsHighPrecision,
    #[serde(alias = "QuantUMS (high accuracy)")]
    QuantumsHighAccuracy,
    #[serde(alias = "Legacy (direct)")]
    Legacy,
}

impl QuantificationStrategy {
    pub fn flags(self) -> &'static [&'static str] {
        match self {
            QuantificationStrategy::QuantumsHighPrecision => &[],
            QuantificationStrategy::QuantumsHighAccuracy => &["--high-acc"],
            QuantificationStrategy::Legacy => &["--direct-quant"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossRunNormalization {
    #[default]
    #[serde(alias = "RT-dependent")]
    RtDependent,
    #[serde(alias = "Global")]
    Global,
    #[serde(alias = "RT & signal-dep. (experimental)")]
    RtAndSignalDependent,
    #[serde(alias = "Off")]
    Off,
}

impl CrossRunNormalization {
    pub fn flags(self) -> &'static [&'static str] {
        match self {
            CrossRunNormalization::RtDependent => &[],
            CrossRunNormalization::Global => &["--global-norm"],
            CrossRunNormalization::RtAndSignalDependent => &["--sig-norm"],
            CrossRunNormalization::Off => &["--no-norm"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryGeneration {
    #[default]
    #[serde(alias = "IDs, RT & IM profiling")]
    IdsRtImProfiling,
    #[serde(alias = "IDs profiling")]
    IdsProfiling,
    #[serde(alias = "Smart profiling")]
    SmartProfiling,
    #[serde(alias = "Full profiling")]
    FullProfiling,
}

impl LibraryGeneration {
    pub fn flags(self) -> &'static [&'static str] {
        match self {
            LibraryGeneration::IdsRtImProfiling => &["--rt-profiling"],
            LibraryGeneration::IdsProfiling => &["--id-profiling"],
            LibraryGeneration::SmartProfiling => &["--smart-profiling"],
            LibraryGeneration::FullProfiling => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedAndRamUsage {
    #[default]
    #[serde(alias = "Optimal results")]
    OptimalResults,
    #[serde(alias = "Low RAM usage")]
    LowRam,
    #[serde(alias = "Low RAM & high speed")]
    LowRamHighSpeed,
    #[serde(alias = "Ultra-fast")]
    UltraFast,
}

impl SpeedAndRamUsage {
    pub fn flags(self) -> &'static [&'static str] {
        match self {
            SpeedAndRamUsage::OptimalResults => &[],
            SpeedAndRamUsage::LowRam => {
                &["--min-corr", "1.0", "--corr-diff", "1.0", "--time-corr-only"]
            }
            SpeedAndRamUsage::LowRamHighSpeed => {
                &["--min-corr", "2.0", "--corr-diff", "1.0", "--time-corr-only"]
            }
            SpeedAndRamUsage::UltraFast => &[
                "--min-corr",
                "2.0",
                "--corr-diff",
                "1.0",
                "--time-corr-only",
                "--extracted-ms1",
            ],
        }
    }
}

/// Unknown keys are rejected so a misspelled option cannot fall back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiannParameters {
    /// Raw data file names from the project's input collection.
    pub inputs: Vec<String>,
    /// Spectral library file name from the project's library collection.
    pub library: String,
    /// Precursor FDR in percent.
    pub precursor_fdr: f64,
    pub log_level: u8,
    pub quantities_matrices: bool,
    pub prosit: bool,
    pub xics: bool,
    /// ppm, 0 = automatic.
    pub mass_accuracy: f64,
    /// ppm, 0 = automatic.
    pub ms1_accuracy: f64,
    /// scans, 0 = automatic.
    pub scan_window: u32,
    pub unrelated_runs: bool,
    pub peptidoforms: bool,
    pub mbr: bool,
    #[serde(alias = "heuristic_protein_interface")]
    pub heuristic_protein_inference: bool,
    pub no_shared_spectra: bool,
    pub protein_inference: ProteinInference,
    pub neural_network_classifier: NeuralNetworkClassifier,
    pub quantification_strategy: QuantificationStrategy,
    #[serde(alias = "cross-run_normalization")]
    pub cross_run_normalization: CrossRunNormalization,
    pub library_generation: LibraryGeneration,
    pub speed_and_ram_usage: SpeedAndRamUsage,
    pub additional_options: String,
}

impl Default for DiannParameters {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            library: String::new(),
            precursor_fdr: 1.0,
            log_level: 1,
            quantities_matrices: true,
            prosit: false,
            xics: false,
            mass_accuracy: 0.0,
            ms1_accuracy: 0.0,
            scan_window: 0,
            unrelated_runs: false,
            peptidoforms: false,
            mbr: false,
            heuristic_protein_inference: true,
            no_shared_spectra: true,
            protein_inference: ProteinInference::default(),
            neural_network_classifier: NeuralNetworkClassifier::default(),
            quantification_strategy: QuantificationStrategy::default(),
            cross_run_normalization: CrossRunNormalization::default(),
            library_generation: LibraryGeneration::default(),
            speed_and_ram_usage: SpeedAndRamUsage::default(),
            additional_options: String::new(),
        }
    }
}

impl SearchParameters for DiannParameters {
    fn references(&self) -> FileReferences {
        FileReferences {
            inputs: self.inputs.clone(),
            libraries: if self.library.is_empty() {
                Vec::new()
            } else {
                vec![self.library.clone()]
            },
        }
    }

    fn set_references(&mut self, references: FileReferences) -> Result<()> {
        if references.libraries.len() > 1 {
            return Err(Error::Validation(format!(
                "DIA-NN takes one spectral library, got {}",
                references.libraries.len()
            )));
        }
        self.inputs = references.inputs;
        self.library = references.libraries.into_iter().next().unwrap_or_default();
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::Validation("no data files selected".to_string()));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = self.inputs.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(Error::Validation(format!("data file '{}' selected twice", dup)));
        }
        if self.library.is_empty() {
            return Err(Error::Validation("no spectral library selected".to_string()));
        }
        if !(self.precursor_fdr > 0.0 && self.precursor_fdr <= 100.0) {
            return Err(Error::Validation(format!(
                "precursor FDR must be within (0, 100] percent, got {}",
                self.precursor_fdr
            )));
        }
        if self.log_level > MAX_LOG_LEVEL {
            return Err(Error::Validation(format!(
                "log level must be 0..={}, got {}",
                MAX_LOG_LEVEL, self.log_level
            )));
        }
        for (label, value) in [
            ("mass accuracy", self.mass_accuracy),
            ("MS1 accuracy", self.ms1_accuracy),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Validation(format!(
                    "{} must be a non-negative number, got {}",
                    label, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DiannCompiler {
    binary: String,
    scheduler: SchedulerConfig,
}

impl DiannCompiler {
    pub fn new(binary: impl Into<String>, scheduler: SchedulerConfig) -> Self {
        Self {
            binary: binary.into(),
            scheduler,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.tools.diann.clone(), config.scheduler.clone())
    }

    /// Structured invocation, before rendering.
    pub fn command(&self, params: &DiannParameters, paths: &ResolvedPaths) -> CommandLine {
        let mut cmd = CommandLine::new(self.binary.as_str());
        cmd.option("--threads", self.scheduler.cpus_per_task);

        for input in &paths.inputs {
            cmd.option("--f", input);
        }
        for library in &paths.libraries {
            cmd.option("--lib", library);
        }

        cmd.option("--verbose", params.log_level)
            .option("--out", join(&paths.search_dir, REPORT_FILE))
            .option("--qvalue", decimal(params.precursor_fdr / 100.0));

        if params.quantities_matrices {
            cmd.flag("--matrices");
        }
        push_flags(&mut cmd, params.speed_and_ram_usage.flags());
        if params.prosit {
            cmd.flag("--prosit");
        }
        if params.xics {
            cmd.flag("--xic");
        }
        cmd.flag("--unimod4");

        if params.scan_window != 0 {
            cmd.option("--window", params.scan_window);
        }
        if params.mass_accuracy != 0.0 {
            cmd.option("--mass-acc", decimal(params.mass_accuracy));
        }
        if params.ms1_accuracy != 0.0 {
            cmd.option("--mass-acc-ms1", decimal(params.ms1_accuracy));
        }

        push_flags(&mut cmd, params.neural_network_classifier.flags());
        if params.unrelated_runs {
            cmd.flag("--individual-mass-acc").flag("--individual-windows");
        }
        if params.peptidoforms {
            cmd.flag("--peptidoforms");
        }
        if !params.no_shared_spectra {
            cmd.option("--int-removal", 0);
        }
        if params.mbr {
            cmd.flag("--reanalyse");
        }
        if params.heuristic_protein_inference {
            cmd.flag("--relaxed-prot-inf");
        }
        push_flags(&mut cmd, params.library_generation.flags());
        push_flags(&mut cmd, params.protein_inference.flags());
        push_flags(&mut cmd, params.quantification_strategy.flags());
        push_flags(&mut cmd, params.cross_run_normalization.flags());

        cmd.passthrough(&params.additional_options);
        cmd
    }
}

fn push_flags(cmd: &mut CommandLine, flags: &[&str]) {
    for flag in flags {
        cmd.arg(*flag);
    }
}

impl SearchCompiler for DiannCompiler {
    type Params = DiannParameters;

    fn tool(&self) -> SearchTool {
        SearchTool::Diann
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::diann()
    }

    fn compile(&self, params: &DiannParameters, paths: &ResolvedPaths) -> Result<CompiledSearch> {
        params.validate()?;
        check_resolved(&params.references(), paths)?;
        let command = self.command(params, paths);
        let script = render_job_script(&self.scheduler, &paths.project_dir, &command);
        Ok(CompiledSearch {
            command,
            script,
            companions: Vec::new(),
        })
    }
}
