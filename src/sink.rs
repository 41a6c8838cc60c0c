use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use spermsim_common::{ContactEvent, OutputFormat, RunSummary, SimulationConfig};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::simulation::SimulationRun;
use crate::trajectory::Trajectory;

/// Opaque identifier handed out by a sink for linking later writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run metadata as persisted: the full configuration plus the seed actually used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: RunId,
    pub seed: u64,
    pub config: SimulationConfig,
}

/// Storage for run metadata and contact lists.
pub trait PersistenceSink {
    fn save_run_meta(&mut self, config: &SimulationConfig, seed: u64) -> Result<RunId>;
    fn save_summary(&mut self, run: &RunId, contact_count: usize) -> Result<()>;
    fn save_contacts(&mut self, run: &RunId, contacts: &[ContactEvent]) -> Result<()>;
}

/// Writes metadata, then the summary, then the contacts when there are any.
pub fn persist_run<S: PersistenceSink + ?Sized>(
    sink: &mut S,
    config: &SimulationConfig,
    run: &SimulationRun,
) -> Result<RunId> {
    let run_id = sink.save_run_meta(config, run.seed)?;
    sink.save_summary(&run_id, run.contacts.len())?;
    if !run.contacts.is_empty() {
        sink.save_contacts(&run_id, &run.contacts)?;
    }
    Ok(run_id)
}

/// A run as held by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub meta: RunMeta,
    pub summary: Option<RunSummary>,
    pub contacts: Vec<ContactEvent>,
}

/// In-process sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    runs: Vec<StoredRun>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[StoredRun] {
        &self.runs
    }

    pub fn get(&self, run: &RunId) -> Option<&StoredRun> {
        self.runs.iter().find(|r| &r.meta.run_id == run)
    }

    fn get_mut(&mut self, run: &RunId) -> Result<&mut StoredRun> {
        self.runs
            .iter_mut()
            .find(|r| &r.meta.run_id == run)
            .with_context(|| format!("unknown run id '{}'", run))
    }
}

impl PersistenceSink for MemorySink {
    fn save_run_meta(&mut self, config: &SimulationConfig, seed: u64) -> Result<RunId> {
        let run_id = RunId(format!("mem-{}", self.runs.len() + 1));
        self.runs.push(StoredRun {
            meta: RunMeta { run_id: run_id.clone(), seed, config: config.clone() },
            summary: None,
            contacts: Vec::new(),
        });
        Ok(run_id)
    }

    fn save_summary(&mut self, run: &RunId, contact_count: usize) -> Result<()> {
        let stored = self.get_mut(run)?;
        stored.summary = Some(RunSummary { run_id: run.to_string(), contact_count });
        Ok(())
    }

    fn save_contacts(&mut self, run: &RunId, contacts: &[ContactEvent]) -> Result<()> {
        self.get_mut(run)?.contacts.extend_from_slice(contacts);
        Ok(())
    }
}

/// Directory-backed sink: `<base>_<run>_meta.json`, `<base>_<run>_summary.json`
/// and `<base>_<run>_contacts.csv`.
#[derive(Debug)]
pub struct FileSink {
    directory: PathBuf,
    base_filename: String,
    runs_saved: u32,
}

impl FileSink {
    /// Creates the output directory if needed.
    pub fn new<P: AsRef<Path>>(directory: P, base_filename: &str) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create output directory '{}'", directory.display()))?;
        Ok(Self { directory, base_filename: base_filename.to_string(), runs_saved: 0 })
    }

    pub fn path_for(&self, run: &RunId, suffix: &str) -> PathBuf {
        self.directory.join(format!("{}_{}_{}", self.base_filename, run, suffix))
    }

    /// Dumps the trajectory as `[particle][step][xyz]` in the requested encoding.
    pub fn save_trajectory(&self, run: &RunId, trajectory: &Trajectory, format: OutputFormat) -> Result<PathBuf> {
        let path = self.path_for(run, &format!("trajectory.{}", format.extension()));
        write_trajectory(&path, trajectory, format)?;
        info!("Trajectory {:?} saved to {}", trajectory.shape(), path.display());
        Ok(path)
    }
}

impl PersistenceSink for FileSink {
    fn save_run_meta(&mut self, config: &SimulationConfig, seed: u64) -> Result<RunId> {
        self.runs_saved += 1;
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
        let run_id = RunId(format!("{}-{:03}", millis, self.runs_saved));

        let meta = RunMeta { run_id: run_id.clone(), seed, config: config.clone() };
        let path = self.path_for(&run_id, "meta.json");
        let file = File::create(&path).with_context(|| format!("Error creating '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &meta)
            .with_context(|| format!("Error writing run metadata to '{}'", path.display()))?;
        writer.flush()?;
        Ok(run_id)
    }

    fn save_summary(&mut self, run: &RunId, contact_count: usize) -> Result<()> {
        let summary = RunSummary { run_id: run.to_string(), contact_count };
        let path = self.path_for(run, "summary.json");
        let file = File::create(&path).with_context(|| format!("Error creating '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &summary)
            .with_context(|| format!("Error writing summary to '{}'", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    fn save_contacts(&mut self, run: &RunId, contacts: &[ContactEvent]) -> Result<()> {
        let path = self.path_for(run, "contacts.csv");
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Error creating '{}'", path.display()))?;
        writer.write_record(["sperm", "step", "t_sec", "x", "y", "z"])?;
        for contact in contacts {
            let (sperm, step, t_sec, x, y, z) = contact.to_row();
            writer.write_record(&[
                sperm.to_string(),
                step.to_string(),
                t_sec.to_string(),
                x.to_string(),
                y.to_string(),
                z.to_string(),
            ])?;
        }
        writer.flush()?;
        info!("{} contact(s) saved to {}", contacts.len(), path.display());
        Ok(())
    }
}

pub fn write_trajectory(path: &Path, trajectory: &Trajectory, format: OutputFormat) -> Result<()> {
    let nested = trajectory.to_nested();
    let file = File::create(path).with_context(|| format!("Error creating '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Json => serde_json::to_writer(&mut writer, &nested)?,
        OutputFormat::Bincode => bincode::serialize_into(&mut writer, &nested)?,
        OutputFormat::MessagePack => rmp_serde::encode::write(&mut writer, &nested)?,
    }
    writer.flush()?;
    Ok(())
}
