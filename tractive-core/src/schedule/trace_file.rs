//! Tab-separated diagnostic trace of a schedule: one line per queried time per train on the line.

use super::MultiTrackSchedule;
use crate::imports::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// One line of the trace file, columns in file order
pub struct TraceRecord {
    /// s
    pub time: f64,
    /// A
    pub active_amperage: f64,
    pub track_number: u32,
    /// km
    pub coordinate: f64,
    pub mass_rate: f64,
    pub route_index: usize,
}

/// Queries `schedule` every `step` over its computation boundary and writes every position.
/// Returns the number of lines written.
pub fn write_trace<P: AsRef<Path>>(
    schedule: &MultiTrackSchedule,
    filepath: P,
    step: si::Time,
) -> anyhow::Result<usize> {
    ensure!(
        step > si::Time::ZERO,
        "{}\ntrace step must be positive",
        format_dbg!()
    );
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(filepath.as_ref())
        .with_context(|| format_dbg!(filepath.as_ref()))?;
    let mut wrtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(file);
    let (t_left, t_right) = schedule.boundary();
    let mut lines = 0;
    for k in 0.. {
        let time = t_left + step * k as f64;
        if time > t_right {
            break;
        }
        for position in schedule.at(time) {
            wrtr.serialize(TraceRecord {
                time: time.get::<si::second>(),
                active_amperage: position.load.active(),
                track_number: position.track_number,
                coordinate: position.coordinate,
                mass_rate: position.mass_rate,
                route_index: position.route_index,
            })?;
            lines += 1;
        }
    }
    wrtr.flush()?;
    #[cfg(feature = "logging")]
    log::debug!(
        "wrote {} trace lines to {:?}",
        lines,
        filepath.as_ref()
    );
    Ok(lines)
}

/// Reads a trace written by [write_trace]
pub fn read_trace<P: AsRef<Path>>(filepath: P) -> anyhow::Result<Vec<TraceRecord>> {
    let file = File::open(filepath.as_ref()).with_context(|| format_dbg!(filepath.as_ref()))?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_reader(file);
    let mut records = vec![];
    for result in rdr.deserialize() {
        records.push(result?);
    }
    Ok(records)
}
