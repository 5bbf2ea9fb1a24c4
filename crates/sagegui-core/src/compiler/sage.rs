//! Sage strategy: a JSON configuration written next to the script, plus a
//! short command line carrying the output switches.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::command::CommandLine;
use super::mods::{validate_keys, RESIDUES};
use super::script::render_job_script;
use super::{
    check_resolved, CompanionFile, CompiledSearch, FileReferences, ResolvedPaths, SearchCompiler,
    SearchParameters,
};
use crate::config::{AppConfig, SchedulerConfig, SearchTool};
use crate::error::{Error, Result};
use crate::store::join;
use crate::workspace::ResourceSchema;

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tolerance {
    Ppm(f64, f64),
    Da(f64, f64),
}

impl Tolerance {
    fn bounds(self) -> (f64, f64) {
        match self {
            Tolerance::Ppm(lo, hi) | Tolerance::Da(lo, hi) => (lo, hi),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enzyme {
    pub missed_cleavages: u8,
    pub min_len: u32,
    pub max_len: u32,
    /// Residues to cleave after; empty for non-specific, `$` for no digestion.
    pub cleave_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict: Option<String>,
    pub c_terminal: bool,
    pub semi_enzymatic: bool,
}

impl Default for Enzyme {
    fn default() -> Self {
        Self {
            missed_cleavages: 1,
            min_len: 5,
            max_len: 50,
            cleave_at: "KR".to_string(),
            restrict: Some("P".to_string()),
            c_terminal: true,
            semi_enzymatic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SageDatabase {
    pub bucket_size: u32,
    pub enzyme: Enzyme,
    pub peptide_min_mass: f64,
    pub peptide_max_mass: f64,
    pub ion_kinds: Vec<String>,
    pub min_ion_index: u32,
    pub static_mods: BTreeMap<String, f64>,
    pub variable_mods: BTreeMap<String, Vec<f64>>,
    pub max_variable_mods: u32,
    pub decoy_tag: String,
    pub generate_decoys: bool,
}

impl Default for SageDatabase {
    fn default() -> Self {
        let mut static_mods = BTreeMap::new();
        static_mods.insert("C".to_string(), 57.0215);
        Self {
            bucket_size: 8192,
            enzyme: Enzyme::default(),
            peptide_min_mass: 500.0,
            peptide_max_mass: 5000.0,
            ion_kinds: vec!["b".to_string(), "y".to_string()],
            min_ion_index: 2,
            static_mods,
            variable_mods: BTreeMap::new(),
            max_variable_mods: 2,
            decoy_tag: "rev_".to_string(),
            generate_decoys: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TmtLabel {
    Tmt6,
    Tmt10,
    Tmt11,
    Tmt16,
    Tmt18,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SageQuant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmt: Option<TmtLabel>,
    pub lfq: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SageParameters {
    /// mzML file names from the input collection.
    pub inputs: Vec<String>,
    /// FASTA file name from the library collection.
    pub fasta: String,
    pub database: SageDatabase,
    pub quant: SageQuant,
    pub precursor_tol: Tolerance,
    pub fragment_tol: Tolerance,
    pub precursor_charge: [u8; 2],
    pub isotope_errors: [i8; 2],
    pub deisotope: bool,
    pub chimera: bool,
    pub wide_window: bool,
    pub predict_rt: bool,
    pub min_peaks: u32,
    pub max_peaks: u32,
    pub min_matched_peaks: u32,
    pub max_fragment_charge: Option<u8>,
    pub report_psms: u32,
    /// Files processed in parallel, 0 = tool default.
    pub batch_size: u32,
    pub write_pin: bool,
    pub parquet: bool,
    pub annotate_matches: bool,
}

impl Default for SageParameters {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            fasta: String::new(),
            database: SageDatabase::default(),
            quant: SageQuant::default(),
            precursor_tol: Tolerance::Da(-500.0, 100.0),
            fragment_tol: Tolerance::Ppm(-10.0, 10.0),
            precursor_charge: [2, 4],
            isotope_errors: [-1, 3],
            deisotope: false,
            chimera: false,
            wide_window: false,
            predict_rt: true,
            min_peaks: 15,
            max_peaks: 150,
            min_matched_peaks: 6,
            max_fragment_charge: None,
            report_psms: 1,
            batch_size: 0,
            write_pin: false,
            parquet: false,
            annotate_matches: false,
        }
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(label: &str, lo: T, hi: T) -> Result<()> {
    // NaN compares as unordered and is rejected with reversed bounds.
    if !matches!(lo.partial_cmp(&hi), Some(Ordering::Less | Ordering::Equal)) {
        return Err(Error::Validation(format!(
            "{} lower bound {} exceeds upper bound {}",
            label, lo, hi
        )));
    }
    Ok(())
}

/// JSON has no NaN or infinity, so float bounds must be finite before they are ordered.
fn check_finite_range(label: &str, lo: f64, hi: f64) -> Result<()> {
    if !lo.is_finite() || !hi.is_finite() {
        return Err(Error::Validation(format!(
            "{} bounds must be finite numbers, got {} and {}",
            label, lo, hi
        )));
    }
    check_range(label, lo, hi)
}

impl SearchParameters for SageParameters {
    fn references(&self) -> FileReferences {
        FileReferences {
            inputs: self.inputs.clone(),
            libraries: if self.fasta.is_empty() {
                Vec::new()
            } else {
                vec![self.fasta.clone()]
            },
        }
    }

    fn set_references(&mut self, references: FileReferences) -> Result<()> {
        if references.libraries.len() > 1 {
            return Err(Error::Validation(format!(
                "Sage takes one FASTA database, got {}",
                references.libraries.len()
            )));
        }
        self.inputs = references.inputs;
        self.fasta = references.libraries.into_iter().next().unwrap_or_default();
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_keys("static_mods", &self.database.static_mods)?;
        validate_keys("variable_mods", &self.database.variable_mods)?;
        if let Some((key, _)) = self
            .database
            .static_mods
            .iter()
            .find(|(_, mass)| !mass.is_finite())
        {
            return Err(Error::Validation(format!("static mod '{}' mass is not finite", key)));
        }
        if let Some((key, _)) = self
            .database
            .variable_mods
            .iter()
            .find(|(_, masses)| masses.is_empty() || masses.iter().any(|m| !m.is_finite()))
        {
            return Err(Error::Validation(format!(
                "variable mod '{}' needs one or more finite masses",
                key
            )));
        }

        if self.inputs.is_empty() {
            return Err(Error::Validation("no mzML files selected".to_string()));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = self.inputs.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(Error::Validation(format!("mzML file '{}' selected twice", dup)));
        }
        if self.fasta.is_empty() {
            return Err(Error::Validation("no FASTA database selected".to_string()));
        }

        let enzyme = &self.database.enzyme;
        if enzyme.cleave_at != "$" && !enzyme.cleave_at.chars().all(|c| RESIDUES.contains(c)) {
            return Err(Error::Validation(format!(
                "enzyme cleave_at '{}' must list residues of {} or be '$'",
                enzyme.cleave_at, RESIDUES
            )));
        }
        check_range("peptide length", enzyme.min_len, enzyme.max_len)?;
        check_finite_range(
            "peptide mass",
            self.database.peptide_min_mass,
            self.database.peptide_max_mass,
        )?;
        let (lo, hi) = self.precursor_tol.bounds();
        check_finite_range("precursor tolerance", lo, hi)?;
        let (lo, hi) = self.fragment_tol.bounds();
        check_finite_range("fragment tolerance", lo, hi)?;
        check_range("precursor charge", self.precursor_charge[0], self.precursor_charge[1])?;
        if self.precursor_charge[0] == 0 {
            return Err(Error::Validation("precursor charge must start at 1 or higher".to_string()));
        }
        check_range("isotope errors", self.isotope_errors[0], self.isotope_errors[1])?;
        check_range("peak count", self.min_peaks, self.max_peaks)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DatabaseSection<'a> {
    #[serde(flatten)]
    settings: &'a SageDatabase,
    fasta: &'a str,
}

#[derive(Serialize)]
struct SageConfigFile<'a> {
    database: DatabaseSection<'a>,
    quant: &'a SageQuant,
    precursor_tol: Tolerance,
    fragment_tol: Tolerance,
    precursor_charge: [u8; 2],
    isotope_errors: [i8; 2],
    deisotope: bool,
    chimera: bool,
    wide_window: bool,
    predict_rt: bool,
    min_peaks: u32,
    max_peaks: u32,
    min_matched_peaks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_fragment_charge: Option<u8>,
    report_psms: u32,
    output_directory: &'a str,
    mzml_paths: &'a [String],
}

#[derive(Debug, Clone)]
pub struct SageCompiler {
    binary: String,
    scheduler: SchedulerConfig,
}

impl SageCompiler {
    pub fn new(binary: impl Into<String>, scheduler: SchedulerConfig) -> Self {
        Self {
            binary: binary.into(),
            scheduler,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.tools.sage.clone(), config.scheduler.clone())
    }

    /// Render the JSON configuration with absolute paths substituted in.
    pub fn render_config(&self, params: &SageParameters, paths: &ResolvedPaths) -> Result<String> {
        let fasta = paths.libraries.first().map(String::as_str).unwrap_or_default();
        let file = SageConfigFile {
            database: DatabaseSection {
                settings: &params.database,
                fasta,
            },
            quant: &params.quant,
            precursor_tol: params.precursor_tol,
            fragment_tol: params.fragment_tol,
            precursor_charge: params.precursor_charge,
            isotope_errors: params.isotope_errors,
            deisotope: params.deisotope,
            chimera: params.chimera,
            wide_window: params.wide_window,
            predict_rt: params.predict_rt,
            min_peaks: params.min_peaks,
            max_peaks: params.max_peaks,
            min_matched_peaks: params.min_matched_peaks,
            max_fragment_charge: params.max_fragment_charge,
            report_psms: params.report_psms,
            output_directory: &paths.search_dir,
            mzml_paths: &paths.inputs,
        };
        let mut json = serde_json::to_string_pretty(&file)?;
        json.push('\n');
        Ok(json)
    }

    pub fn command(&self, params: &SageParameters, paths: &ResolvedPaths) -> CommandLine {
        let mut cmd = CommandLine::new(self.binary.as_str());
        if params.batch_size != 0 {
            cmd.option("--batch-size", params.batch_size);
        }
        if params.write_pin {
            cmd.flag("--write-pin");
        }
        if params.parquet {
            cmd.flag("--parquet");
        }
        if params.annotate_matches {
            cmd.flag("--annotate-matches");
        }
        cmd.arg(join(&paths.search_dir, CONFIG_FILE));
        cmd
    }
}

impl SearchCompiler for SageCompiler {
    type Params = SageParameters;

    fn tool(&self) -> SearchTool {
        SearchTool::Sage
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::sage()
    }

    fn compile(&self, params: &SageParameters, paths: &ResolvedPaths) -> Result<CompiledSearch> {
        params.validate()?;
        check_resolved(&params.references(), paths)?;
        let config = self.render_config(params, paths)?;
        let command = self.command(params, paths);
        let script = render_job_script(&self.scheduler, &paths.project_dir, &command);
        Ok(CompiledSearch {
            command,
            script,
            companions: vec![CompanionFile {
                name: CONFIG_FILE.to_string(),
                contents: config,
            }],
        })
    }
}
