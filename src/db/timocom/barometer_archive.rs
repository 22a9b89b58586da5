// Freight barometer for road transport lanes, published by TIMOCOM.
// https://www.timocom.co.uk/transport-barometer

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, error, info};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::db::lib_http::HttpGet;
use crate::db::timocom::lane_record::{Column, LaneRecord, Row, COLUMNS, IDENTIFIERS};
use crate::lanes::{combine_lanes, Combine, Lane};

pub const API_BASE: &str = "https://www.timocom.co.uk/WWW/modules/controller/Barometer.cfc";

#[derive(Debug, Clone)]
pub struct BarometerArchive {
    /// JSON array with the raw API responses of the last download
    pub dump_path: String,
    /// Monthly history for all lanes, accumulated across downloads
    pub monthly_path: String,
    /// Current value for all lanes, accumulated across downloads
    pub now_path: String,
}

/// The two tables produced from one dump.
#[derive(Debug, Default, PartialEq)]
pub struct Processed {
    pub monthly: Vec<Row>,
    pub now: Vec<Row>,
}

/// Row counts of one merged output file.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    pub path: String,
    /// rows in the file before the merge
    pub existing: usize,
    /// existing rows not superseded by the new download
    pub kept: usize,
    pub new: usize,
    pub total: usize,
}

impl BarometerArchive {
    /// Query every lane and write the responses to the dump file.  The
    /// combine mode is checked before any request goes out.  Returns the
    /// number of lanes downloaded successfully.
    pub fn download(
        &self,
        client: &impl HttpGet,
        api_base: &str,
        from_countries: &[String],
        to_countries: &[String],
        combine: &str,
        wait: Duration,
    ) -> Result<usize, Box<dyn Error>> {
        let combine: Combine = combine.parse()?;
        let lanes = combine_lanes(from_countries, to_countries, combine)?;
        info!(
            "Downloading {} lanes ({} combination of {:?} and {:?})",
            lanes.len(),
            combine,
            from_countries,
            to_countries
        );
        let data = download_lanes(client, api_base, &lanes, wait, thread::sleep)?;
        debug!("{:?}", data);
        write_dump(&self.dump_path, &data)?;
        info!("Dumped data to {}", self.dump_path);
        Ok(data.len())
    }

    /// Flatten the dump file and merge it into both CSV files.
    pub fn update_csv_files(&self) -> Result<Vec<MergeSummary>, Box<dyn Error>> {
        let records = read_dump(&self.dump_path)?;
        info!("Read {} lanes from {}", records.len(), self.dump_path);
        let processed = process(&records)?;
        let monthly = update_csv(&self.monthly_path, processed.monthly)?;
        let now = update_csv(&self.now_path, processed.now)?;
        Ok(vec![monthly, now])
    }
}

pub fn lane_url(api_base: &str, lane: &Lane) -> String {
    format!(
        "{}?method=getRemoteBarometerData&wsdl&returnFormat=json&fromCountry={}&toCountry={}",
        api_base, lane.from, lane.to
    )
}

/// Get the barometer data for one lane, tagged with `FROM` and `TO`.
/// Returns `None` if the server didn't answer with a 200.
pub fn get_lane(
    client: &impl HttpGet,
    api_base: &str,
    lane: &Lane,
) -> Result<Option<Value>, Box<dyn Error>> {
    let url = lane_url(api_base, lane);
    debug!("Fetching {}", url);

    let response = match client.get(&url) {
        Ok(response) => response,
        Err(e) => {
            error!("{}: could not download data; {}", lane, e);
            return Ok(None);
        }
    };
    if response.status != 200 {
        error!(
            "{}: status: {}; could not download data",
            lane, response.status
        );
        return Ok(None);
    }

    let mut res: Value = serde_json::from_str(&response.body)?;
    match res.as_object_mut() {
        Some(obj) => {
            obj.insert("FROM".to_string(), Value::String(lane.from.clone()));
            obj.insert("TO".to_string(), Value::String(lane.to.clone()));
        }
        None => return Err(format!("{}: expected a JSON object, got {}", lane, res).into()),
    }
    Ok(Some(res))
}

/// One request per lane, in order, calling `sleep(wait)` after each of
/// them, the last one included.  Lanes that fail to download are left out.
pub fn download_lanes(
    client: &impl HttpGet,
    api_base: &str,
    lanes: &[Lane],
    wait: Duration,
    mut sleep: impl FnMut(Duration),
) -> Result<Vec<Value>, Box<dyn Error>> {
    let mut out = Vec::with_capacity(lanes.len());
    for lane in lanes {
        if let Some(data) = get_lane(client, api_base, lane)? {
            out.push(data);
        }
        sleep(wait);
    }
    if out.len() < lanes.len() {
        error!("Failed to download {} of {} lanes", lanes.len() - out.len(), lanes.len());
    }
    Ok(out)
}

/// Write the JSON array in one go.  A path ending in `.gz` is compressed.
pub fn write_dump(path: &str, data: &[Value]) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = Path::new(path).parent() {
        fs::create_dir_all(dir)?;
    }
    let file = File::create(path)?;
    if path.ends_with(".gz") {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write_pretty(&mut encoder, data)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_pretty(&mut writer, data)?;
        writer.flush()?;
    }
    Ok(())
}

fn write_pretty<W: Write>(writer: W, data: &[Value]) -> Result<(), Box<dyn Error>> {
    let mut ser = serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
    data.serialize(&mut ser)?;
    Ok(())
}

/// Read a dump file, accepts both a json or a json.gz file.
pub fn read_dump(path: &str) -> Result<Vec<LaneRecord>, Box<dyn Error>> {
    let file = File::open(path)?;
    let records: Vec<LaneRecord> = match Path::new(path).extension().and_then(|x| x.to_str()) {
        Some("gz") => serde_json::from_reader(BufReader::new(GzDecoder::new(file)))?,
        _ => serde_json::from_reader(BufReader::new(file))?,
    };
    Ok(records)
}

/// Convert the lane records to tabular data: one monthly row per history
/// value and one row with the current value per lane.
pub fn process(records: &[LaneRecord]) -> Result<Processed, Box<dyn Error>> {
    let mut monthly: Vec<Row> = Vec::new();
    let mut now: Vec<Row> = Vec::with_capacity(records.len());

    for record in records {
        for (key, values) in &record.data_history {
            let year = record.bucket_year(key)?;
            for (idx, value) in values.iter().enumerate() {
                monthly.push(Row {
                    updated_at: record.last_update.clone(),
                    year,
                    month: idx as u32 + 1,
                    day: None,
                    from: record.from.clone(),
                    to: record.to.clone(),
                    value: record.number(value)?,
                });
            }
        }

        let date = record.update_date()?;
        now.push(Row {
            updated_at: record.last_update.clone(),
            year: date.year() as i32,
            month: date.month() as u32,
            day: Some(date.day() as u32),
            from: record.from.clone(),
            to: record.to.clone(),
            value: record.number(&record.data_now)?,
        });
    }

    Ok(Processed { monthly, now })
}

/// Remove the rows of `existing` that are in the new download.  Rows are
/// matched on `identifiers`, by default year, month, day, from and to.
pub fn not_in_new_downloads(
    existing: Vec<Row>,
    new: &[Row],
    identifiers: Option<&[Column]>,
) -> Vec<Row> {
    let identifiers = identifiers.unwrap_or(&IDENTIFIERS);
    debug!("Output file already has {} records", existing.len());
    let new_keys: HashSet<_> = new.iter().map(|row| row.key(identifiers)).collect();
    let kept: Vec<Row> = existing
        .into_iter()
        .filter(|row| !new_keys.contains(&row.key(identifiers)))
        .collect();
    debug!(
        "Output file contains {} records not in current downloads",
        kept.len()
    );
    kept
}

pub fn read_csv(path: &str) -> Result<Vec<Row>, Box<dyn Error>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        let row: Row = row.map_err(|e| format!("{}: {}", path, e))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Overwrite the file.  The header is written even if there are no rows.
pub fn write_csv(path: &str, rows: &[Row]) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = Path::new(path).parent() {
        fs::create_dir_all(dir)?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Merge the new rows into the CSV file.  Existing rows with the same
/// identity as a new row are replaced, new rows go at the end.
pub fn update_csv(path: &str, new: Vec<Row>) -> Result<MergeSummary, Box<dyn Error>> {
    let (existing, kept) = if Path::new(path).exists() {
        let rows = read_csv(path)?;
        let n = rows.len();
        (n, not_in_new_downloads(rows, &new, None))
    } else {
        (0, Vec::new())
    };

    let summary = MergeSummary {
        path: path.to_string(),
        existing,
        kept: kept.len(),
        new: new.len(),
        total: kept.len() + new.len(),
    };

    let mut rows = kept;
    rows.extend(new);
    write_csv(path, &rows)?;
    info!(
        "Wrote {} rows to {} ({} kept, {} new)",
        summary.total, path, summary.kept, summary.new
    );
    Ok(summary)
}
