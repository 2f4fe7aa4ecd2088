//! Safetensors I/O for recordings and graph outputs.
//!
//! Reader: parses a `raw.safetensors` holding `data` `[C, T]`, `chan_pos`
//! `[C, D]` and optionally `ch_names` (newline-separated U8 bytes) and
//! `sfreq`.  Writer: [`StWriter`] for F32/F64/I32/U8 tensors.
use anyhow::{bail, ensure, Context, Result};
use ndarray::Array2;
use std::collections::HashMap;
use std::path::Path;

use crate::sensors::SensorSet;

// ── Low-level safetensors parser (raw bytes → ndarray; no dependency on the
//    `safetensors` crate's tensor types). ───────────────────────────────────

type Header = HashMap<String, serde_json::Value>;

fn parse_header(bytes: &[u8]) -> Result<(Header, usize)> {
    ensure!(bytes.len() >= 8, "safetensors file too small");
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = usize::try_from(u64::from_le_bytes(len)).context("safetensors header length overflows")?;
    let end = 8usize.checked_add(n).context("safetensors header length overflows")?;
    ensure!(bytes.len() >= end, "safetensors header length {n} exceeds file size");
    let header: Header = serde_json::from_slice(&bytes[8..end])
        .context("failed to parse safetensors header")?;
    Ok((header, end))
}

fn tensor_bytes<'a>(bytes: &'a [u8], data_start: usize, entry: &serde_json::Value) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("tensor entry without data_offsets")?;
    ensure!(offsets.len() == 2, "data_offsets must hold two values");
    let s = offsets[0].as_u64().context("bad start offset")? as usize;
    let e = offsets[1].as_u64().context("bad end offset")? as usize;
    let start = data_start.checked_add(s).context("tensor start offset overflows")?;
    let end = data_start.checked_add(e).context("tensor end offset overflows")?;
    ensure!(s <= e && end <= bytes.len(), "tensor offsets [{s}, {e}) out of bounds");
    Ok(&bytes[start..end])
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry without shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("bad shape dimension"))
        .collect()
}

/// Read a float tensor (F32 or F64) as f64 values.
fn read_float_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    match entry["dtype"].as_str() {
        Some("F32") => Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect()),
        Some("F64") => Ok(raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect()),
        other => bail!("unsupported dtype {other:?}, expected F32 or F64"),
    }
}

fn read_matrix(bytes: &[u8], data_start: usize, header: &Header, key: &str) -> Result<Array2<f64>> {
    let entry = header.get(key).with_context(|| format!("missing '{key}' key"))?;
    let shape = shape_of(entry)?;
    ensure!(shape.len() == 2, "'{key}' must be 2-D, got shape {shape:?}");
    let values = read_float_tensor(bytes, data_start, entry)?;
    Array2::from_shape_vec((shape[0], shape[1]), values)
        .with_context(|| format!("'{key}' payload does not match shape {shape:?}"))
}

// ── Public structs ────────────────────────────────────────────────────────────

/// EEG recording loaded from a safetensors file.
#[derive(Debug, Clone)]
pub struct RawData {
    /// `[C, T]`; missing channels may be NaN rows.
    pub data: Array2<f64>,
    /// `[C, D]` electrode positions, `D ∈ {2, 3}`.
    pub chan_pos: Array2<f64>,
    /// Channel names (may be empty if not saved).
    pub ch_names: Vec<String>,
    /// Sampling rate in Hz, when stored.
    pub sfreq: Option<f64>,
}

impl RawData {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let data = read_matrix(&bytes, data_start, &header, "data")?;
        let chan_pos = read_matrix(&bytes, data_start, &header, "chan_pos")?;
        ensure!(
            data.nrows() == chan_pos.nrows(),
            "{} data channels but {} positions",
            data.nrows(),
            chan_pos.nrows()
        );

        let sfreq = match header.get("sfreq") {
            Some(e) => read_float_tensor(&bytes, data_start, e)?.first().copied(),
            None => None,
        };

        // Channel names are optional.
        let ch_names = match header.get("ch_names") {
            Some(e) => {
                let raw = tensor_bytes(&bytes, data_start, e)?;
                std::str::from_utf8(raw)
                    .context("ch_names is not UTF-8")?
                    .split('\n')
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            }
            None => vec![],
        };

        Ok(RawData { data, chan_pos, ch_names, sfreq })
    }

    /// Build the montage, inventing `ch0, ch1, …` when names were not saved.
    pub fn sensors(&self) -> Result<SensorSet> {
        let names = if self.ch_names.is_empty() {
            (0..self.chan_pos.nrows()).map(|i| format!("ch{i}")).collect()
        } else {
            self.ch_names.clone()
        };
        Ok(SensorSet::new(names, self.chan_pos.clone())?)
    }
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Tensor entry waiting to be written: name, dtype tag, shape, payload.
#[derive(Debug)]
struct Pending {
    name: String,
    dtype: &'static str,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

/// Collects named tensors and writes them as one safetensors file.
///
/// Entries are laid out in insertion order.
///
/// ```rust,no_run
/// use eegrasp::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("signal", &[1.0, 2.0, 3.0], &[1, 3]);
/// w.add_names("ch_names", &["Fp1".to_string(), "Cz".to_string()]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StWriter {
    entries: Vec<Pending>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, name: &str, dtype: &'static str, shape: &[usize], bytes: Vec<u8>) {
        self.entries.push(Pending { name: name.to_owned(), dtype, shape: shape.to_vec(), bytes });
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        self.push(name, "F32", shape, data.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        self.push(name, "F64", shape, data.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    /// Row-major `[rows, cols]` F64 tensor.
    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let bytes = arr.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.push(name, "F64", &[arr.nrows(), arr.ncols()], bytes);
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        self.push(name, "I32", shape, data.iter().flat_map(|v| v.to_le_bytes()).collect());
    }

    /// Newline-joined UTF-8 names stored as a U8 tensor.
    pub fn add_names(&mut self, name: &str, names: &[String]) {
        let bytes = names.join("\n").into_bytes();
        let len = bytes.len();
        self.push(name, "U8", &[len], bytes);
    }

    /// JSON header padded with spaces to a multiple of 8 bytes.
    fn header(&self) -> Result<Vec<u8>> {
        let mut map = serde_json::Map::new();
        let mut offset = 0usize;
        for e in &self.entries {
            let end = offset + e.bytes.len();
            map.insert(
                e.name.clone(),
                serde_json::json!({ "dtype": e.dtype, "shape": e.shape, "data_offsets": [offset, end] }),
            );
            offset = end;
        }
        let mut hdr = serde_json::to_vec(&map)?;
        hdr.resize(hdr.len().next_multiple_of(8), b' ');
        Ok(hdr)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let hdr = self.header()?;
        let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        out.write_all(&(hdr.len() as u64).to_le_bytes())?;
        out.write_all(&hdr)?;
        for e in &self.entries {
            out.write_all(&e.bytes)?;
        }
        out.flush().with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
