//! Tesseract CLI text oracle
//!
//! Runs `tesseract <image> stdout -l <langs> tsv` and groups the recognized
//! words into blocks (or lines). Each group's box is the union of its word
//! boxes and its text is the words joined by single spaces.

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

use super::{OcrError, Result, TextOracle};
use crate::segment::TextBox;

/// Default recognition languages
const DEFAULT_LANGUAGES: &str = "por+eng";

/// Default per-call timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Child process poll interval
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TSV level of word rows
const WORD_LEVEL: u32 = 5;

/// Number of TSV columns
const TSV_COLUMNS: usize = 12;

/// How recognized words are grouped into text boxes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrGranularity {
    /// One box per text block
    #[default]
    Block,
    /// One box per text line
    Line,
}

/// Options for the Tesseract oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractOptions {
    /// Explicit path to the binary (None = look up `tesseract` on PATH)
    pub binary: Option<PathBuf>,
    /// Language list in Tesseract syntax, e.g. `por+eng`
    pub languages: String,
    /// Word grouping
    pub granularity: OcrGranularity,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for TesseractOptions {
    fn default() -> Self {
        Self {
            binary: None,
            languages: DEFAULT_LANGUAGES.to_string(),
            granularity: OcrGranularity::Block,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Text oracle backed by the `tesseract` command line tool
#[derive(Debug, Clone, Default)]
pub struct TesseractOracle {
    options: TesseractOptions,
}

impl TesseractOracle {
    pub fn new(options: TesseractOptions) -> Self {
        Self { options }
    }

    /// Check whether the binary can be found
    pub fn is_available(&self) -> bool {
        self.resolve_binary().is_ok()
    }

    fn resolve_binary(&self) -> Result<PathBuf> {
        match &self.options.binary {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(OcrError::ToolNotFound(path.display().to_string())),
            None => which::which("tesseract")
                .map_err(|_| OcrError::ToolNotFound("tesseract".to_string())),
        }
    }

    /// Run the binary and return its TSV output
    fn run(&self, binary: &Path, input: &Path) -> Result<String> {
        let mut child = Command::new(binary)
            .arg(input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.options.languages)
            .arg("tsv")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain pipes on threads so a full pipe cannot stall the child
        let stdout = child.stdout.take();
        let stdout_reader = std::thread::spawn(move || read_pipe(stdout));
        let stderr = child.stderr.take();
        let stderr_reader = std::thread::spawn(move || read_pipe(stderr));

        let timeout = Duration::from_secs(self.options.timeout_secs);
        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OcrError::Timeout(self.options.timeout_secs));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout_reader
            .join()
            .map_err(|_| OcrError::Failed("stdout reader panicked".to_string()))??;
        let stderr = stderr_reader.join().ok().and_then(|r| r.ok()).unwrap_or_default();

        if !status.success() {
            return Err(OcrError::Failed(format!(
                "tesseract exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        Ok(stdout)
    }

    /// Parse Tesseract TSV output into grouped text boxes
    pub fn parse_tsv(tsv: &str, granularity: OcrGranularity) -> Result<Vec<TextBox>> {
        let mut order: Vec<WordGroup> = Vec::new();
        let mut index: HashMap<(u32, u32, u32, u32), usize> = HashMap::new();

        for (line_no, line) in tsv.lines().enumerate() {
            if line.starts_with("level") || line.trim().is_empty() {
                continue;
            }

            let cols: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
            if cols.len() < TSV_COLUMNS - 1 {
                return Err(OcrError::Parse(format!(
                    "line {}: expected {} columns, got {}",
                    line_no + 1,
                    TSV_COLUMNS,
                    cols.len()
                )));
            }

            let num = |i: usize| -> Result<i64> {
                cols[i].trim().parse::<i64>().map_err(|_| {
                    OcrError::Parse(format!("line {}: bad number {:?}", line_no + 1, cols[i]))
                })
            };

            if num(0)? != i64::from(WORD_LEVEL) {
                continue;
            }

            let text = cols.get(11).map(|t| t.trim()).unwrap_or("");
            if text.is_empty() {
                continue;
            }

            let (page, block, par, line_num) = (num(1)?, num(2)?, num(3)?, num(4)?);
            let key = match granularity {
                OcrGranularity::Block => (page as u32, block as u32, 0, 0),
                OcrGranularity::Line => (page as u32, block as u32, par as u32, line_num as u32),
            };

            let (left, top, width, height) = (num(6)?, num(7)?, num(8)?, num(9)?);
            let word = WordGroup::new(left, top, left + width, top + height, text);

            match index.get(&key) {
                Some(&i) => order[i].absorb(word),
                None => {
                    index.insert(key, order.len());
                    order.push(word);
                }
            }
        }

        Ok(order
            .into_iter()
            .filter_map(WordGroup::into_text_box)
            .collect())
    }
}

impl TextOracle for TesseractOracle {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &RgbImage) -> Result<Vec<TextBox>> {
        let binary = self.resolve_binary()?;

        let input = tempfile::Builder::new()
            .prefix("mailslicer-ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::Input(input.path().to_path_buf(), e.to_string()))?;

        let started = Instant::now();
        let tsv = self.run(&binary, input.path())?;
        let boxes = Self::parse_tsv(&tsv, self.options.granularity)?;

        debug!(
            boxes = boxes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tesseract finished"
        );

        Ok(boxes)
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> std::io::Result<String> {
    let mut out = String::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_string(&mut out)?;
    }
    Ok(out)
}

/// Words accumulated into one output box
struct WordGroup {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    words: Vec<String>,
}

impl WordGroup {
    fn new(x0: i64, y0: i64, x1: i64, y1: i64, text: &str) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            words: vec![text.to_string()],
        }
    }

    fn absorb(&mut self, other: WordGroup) {
        self.x0 = self.x0.min(other.x0);
        self.y0 = self.y0.min(other.y0);
        self.x1 = self.x1.max(other.x1);
        self.y1 = self.y1.max(other.y1);
        self.words.extend(other.words);
    }

    fn into_text_box(self) -> Option<TextBox> {
        let text = self.words.join(" ").trim().to_string();
        if text.is_empty() {
            return None;
        }
        Some(TextBox::new(
            clamp_i32(self.x0),
            clamp_i32(self.y0),
            clamp_i32(self.x1),
            clamp_i32(self.y1),
            text,
        ))
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t700\t400\t-1\t
2\t1\t1\t0\t0\t0\t40\t30\t300\t50\t-1\t
4\t1\t1\t1\t1\t0\t40\t30\t300\t20\t-1\t
5\t1\t1\t1\t1\t1\t40\t30\t120\t20\t95.1\tOferta
5\t1\t1\t1\t1\t2\t170\t32\t170\t18\t93.0\texclusiva
5\t1\t1\t1\t2\t1\t40\t60\t90\t20\t91.2\tsó
5\t1\t1\t1\t2\t2\t140\t60\t60\t20\t90.0\thoje
5\t1\t2\t1\t1\t1\t50\t300\t200\t30\t88.0\tCompre
5\t1\t2\t1\t1\t2\t260\t300\t10\t30\t10.0\t
";

    #[test]
    fn test_default_options() {
        let opts = TesseractOptions::default();
        assert_eq!(opts.languages, "por+eng");
        assert_eq!(opts.granularity, OcrGranularity::Block);
        assert_eq!(opts.timeout_secs, 120);
        assert!(opts.binary.is_none());
    }

    #[test]
    fn test_parse_blocks() {
        let boxes = TesseractOracle::parse_tsv(SAMPLE_TSV, OcrGranularity::Block).unwrap();
        assert_eq!(boxes.len(), 2);

        assert_eq!(boxes[0].text, "Oferta exclusiva só hoje");
        assert_eq!((boxes[0].x0, boxes[0].y0), (40, 30));
        assert_eq!((boxes[0].x1, boxes[0].y1), (340, 80));

        assert_eq!(boxes[1].text, "Compre");
        assert_eq!((boxes[1].y0, boxes[1].y1), (300, 330));
    }

    #[test]
    fn test_parse_lines() {
        let boxes = TesseractOracle::parse_tsv(SAMPLE_TSV, OcrGranularity::Line).unwrap();
        let texts: Vec<&str> = boxes.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Oferta exclusiva", "só hoje", "Compre"]);
        assert_eq!((boxes[0].y0, boxes[0].y1), (30, 50));
    }

    #[test]
    fn test_parse_empty_output() {
        let boxes = TesseractOracle::parse_tsv("", OcrGranularity::Block).unwrap();
        assert!(boxes.is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = TesseractOracle::parse_tsv("5\tx\t1", OcrGranularity::Block);
        assert!(matches!(result, Err(OcrError::Parse(_))));
    }

    #[test]
    fn test_missing_binary() {
        let oracle = TesseractOracle::new(TesseractOptions {
            binary: Some(PathBuf::from("/nonexistent/tesseract")),
            ..Default::default()
        });
        assert!(!oracle.is_available());
        let result = oracle.recognize(&RgbImage::new(4, 4));
        assert!(matches!(result, Err(OcrError::ToolNotFound(_))));
    }
}
