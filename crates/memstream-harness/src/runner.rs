//! Scenario execution engine.

use std::io::SeekFrom;
use std::time::Instant;

use memstream_core::{
    BufferedStream, MemBuffer, SeekableBackend, StrBuffer, StreamError, mem, string,
};
use serde::Serialize;

use crate::fixtures::{ExpectedState, FixtureSet, Op, Scenario, Whence};
use crate::structured_log::{ArtifactIndex, BackendKind, LogEmitter, LogEntry, LogLevel, Outcome};

/// Symbolic name for the errno values the streams report.
#[must_use]
pub fn errno_name(errno: i32) -> &'static str {
    match errno {
        libc::ENOMEM => "ENOMEM",
        libc::ENOENT => "ENOENT",
        libc::EINVAL => "EINVAL",
        libc::EBADF => "EBADF",
        _ => "EUNKNOWN",
    }
}

/// Published view of a caller-owned handle.
trait Published {
    fn published(&self) -> Option<&[u8]>;

    /// Storage-level invariant for the handle type.
    fn well_formed(&self) -> bool {
        true
    }
}

impl Published for MemBuffer {
    fn published(&self) -> Option<&[u8]> {
        self.as_bytes()
    }
}

impl Published for StrBuffer {
    fn published(&self) -> Option<&[u8]> {
        self.as_bytes()
    }

    fn well_formed(&self) -> bool {
        self.as_bytes_with_nul().is_none_or(|raw| {
            raw.len() == self.len() + 1 && raw.iter().position(|&b| b == 0) == Some(self.len())
        })
    }
}

/// What one operation did.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub op: &'static str,
    pub offset: Option<u64>,
    pub length: Option<u64>,
    pub errno: Option<i32>,
    pub latency_ns: u64,
    pub failure: Option<String>,
}

impl StepRecord {
    fn new(op: &'static str) -> Self {
        Self {
            op,
            offset: None,
            length: None,
            errno: None,
            latency_ns: 0,
            failure: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub backend: BackendKind,
    pub mode: String,
    pub passed: bool,
    pub failures: Vec<String>,
    /// Buffer content after the stream is gone; `None` for a null handle.
    pub final_content: Option<Vec<u8>>,
    pub steps: Vec<StepRecord>,
}

impl ScenarioResult {
    fn new(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            backend: scenario.backend,
            mode: scenario.mode.clone(),
            passed: false,
            failures: Vec::new(),
            final_content: None,
            steps: Vec::new(),
        }
    }

    /// Artifact path for the final buffer.
    #[must_use]
    pub fn artifact_path(&self, campaign: &str) -> String {
        format!("{campaign}/{}/{}", self.backend.as_str(), self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<ScenarioResult>,
}

impl RunSummary {
    fn from_results(results: Vec<ScenarioResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Runs fixture scenarios and collects results.
pub struct ScenarioRunner {
    pub campaign: String,
    pub run_id: String,
}

impl ScenarioRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
            run_id: run_id.into(),
        }
    }

    /// Run every scenario in the set.
    #[must_use]
    pub fn run(&self, set: &FixtureSet) -> RunSummary {
        RunSummary::from_results(set.scenarios.iter().map(run_scenario).collect())
    }

    /// Run every scenario, emitting one JSONL line per operation and one per
    /// scenario result.
    pub fn run_logged(
        &self,
        set: &FixtureSet,
        emitter: &mut LogEmitter,
    ) -> std::io::Result<RunSummary> {
        let mut results = Vec::with_capacity(set.scenarios.len());
        for scenario in &set.scenarios {
            let result = run_scenario(scenario);
            self.log_result(&result, emitter)?;
            results.push(result);
        }
        emitter.flush()?;
        Ok(RunSummary::from_results(results))
    }

    /// Digest of every non-null final buffer.
    #[must_use]
    pub fn artifact_index(&self, summary: &RunSummary) -> ArtifactIndex {
        let mut index = ArtifactIndex::new(&self.run_id, &self.campaign);
        for result in &summary.results {
            if let Some(content) = &result.final_content {
                index.add_bytes(result.artifact_path(&self.campaign), "buffer", content);
            }
        }
        index
    }

    fn log_result(&self, result: &ScenarioResult, emitter: &mut LogEmitter) -> std::io::Result<()> {
        for step in &result.steps {
            let level = if step.failure.is_some() {
                LogLevel::Error
            } else {
                LogLevel::Debug
            };
            let mut entry = LogEntry::new("", level, "stream_op")
                .with_scenario(&result.name)
                .with_stream(result.backend, &result.mode)
                .with_op(step.op)
                .with_latency_ns(step.latency_ns)
                .with_outcome(if step.failure.is_some() {
                    Outcome::Fail
                } else {
                    Outcome::Pass
                });
            if let Some(offset) = step.offset {
                entry = entry.with_offset(offset);
            }
            if let Some(length) = step.length {
                entry = entry.with_length(length);
            }
            if let Some(errno) = step.errno {
                entry = entry.with_errno(errno);
            }
            if let Some(failure) = &step.failure {
                entry = entry.with_details(serde_json::json!({ "failure": failure }));
            }
            emitter.emit_entry(entry)?;
        }

        let mut entry = LogEntry::new(
            "",
            if result.passed {
                LogLevel::Info
            } else {
                LogLevel::Error
            },
            "scenario_result",
        )
        .with_scenario(&result.name)
        .with_outcome(if result.passed {
            Outcome::Pass
        } else {
            Outcome::Fail
        })
        .with_details(serde_json::json!({ "failures": result.failures }));
        if let Some(content) = &result.final_content {
            entry = entry
                .with_length(content.len() as u64)
                .with_artifacts(vec![result.artifact_path(&self.campaign)]);
        }
        emitter.emit_entry(entry)
    }
}

/// Execute one scenario against a fresh handle.
#[must_use]
pub fn run_scenario(scenario: &Scenario) -> ScenarioResult {
    let config = scenario.config.to_stream_config();
    let mut result = ScenarioResult::new(scenario);
    match scenario.backend {
        BackendKind::Mem => {
            let mut handle = match scenario.initial.as_deref() {
                Some(initial) => MemBuffer::from(initial),
                None => MemBuffer::null(),
            };
            execute(
                mem::open_with(&mut handle, &scenario.mode, &config),
                scenario,
                &mut result,
            );
            finish(&handle, &scenario.expected, &mut result);
        }
        BackendKind::Str => {
            let mut handle = match scenario.initial.as_deref() {
                Some(initial) => StrBuffer::from(initial),
                None => StrBuffer::null(),
            };
            execute(
                string::open_with(&mut handle, &scenario.mode, &config),
                scenario,
                &mut result,
            );
            finish(&handle, &scenario.expected, &mut result);
        }
    }
    result
}

fn execute<B>(
    opened: Result<BufferedStream<B>, StreamError>,
    scenario: &Scenario,
    result: &mut ScenarioResult,
) where
    B: SeekableBackend,
    B::Handle: Published,
{
    let mut step = StepRecord::new("open");
    let expected = scenario.open_errno.as_deref();
    match (opened, expected) {
        (Ok(stream), None) => {
            step.offset = stream.ftell().ok();
            result.steps.push(step);
            drive(stream, &scenario.ops, result);
        }
        (Ok(_), Some(want)) => {
            step.failure = Some(format!("open succeeded, expected {want}"));
            result.steps.push(step);
        }
        (Err(err), want) => {
            let got = errno_name(err.errno());
            step.errno = Some(err.errno());
            if want != Some(got) {
                step.failure = Some(format!(
                    "open failed with {got} ({err}), expected {}",
                    want.unwrap_or("success")
                ));
            }
            result.steps.push(step);
        }
    }
}

fn drive<B>(stream: BufferedStream<B>, ops: &[Op], result: &mut ScenarioResult)
where
    B: SeekableBackend,
    B::Handle: Published,
{
    let mut stream = Some(stream);
    for (index, op) in ops.iter().enumerate() {
        let started = Instant::now();
        let mut step = StepRecord::new(op.name());

        let check = if let Op::Close { expect_errno } = op {
            match stream.take() {
                Some(s) => expect_errno_of(s.fclose(), expect_errno.as_deref(), &mut step).map(|_| ()),
                None => Err("stream already closed".to_string()),
            }
        } else if let Some(s) = stream.as_mut() {
            apply(s, op, &mut step)
        } else {
            Err("stream already closed".to_string())
        };

        step.latency_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        if let Err(msg) = check {
            step.failure = Some(format!("step {index}: {msg}"));
        }
        result.steps.push(step);
    }
}

/// Match a result against an expected errno name. `Ok(None)` means the
/// operation failed as expected.
fn expect_errno_of<T>(
    res: Result<T, StreamError>,
    want: Option<&str>,
    step: &mut StepRecord,
) -> Result<Option<T>, String> {
    match (res, want) {
        (Ok(value), None) => Ok(Some(value)),
        (Ok(_), Some(want)) => Err(format!("succeeded, expected {want}")),
        (Err(err), want) => {
            step.errno = Some(err.errno());
            let got = errno_name(err.errno());
            match want {
                Some(want) if want == got => Ok(None),
                Some(want) => Err(format!("failed with {got} ({err}), expected {want}")),
                None => Err(format!("unexpected {got}: {err}")),
            }
        }
    }
}

fn apply<B>(s: &mut BufferedStream<B>, op: &Op, step: &mut StepRecord) -> Result<(), String>
where
    B: SeekableBackend,
    B::Handle: Published,
{
    match op {
        Op::Write { data, expect_errno } => {
            if let Some(n) = expect_errno_of(s.fwrite(data.as_bytes()), expect_errno.as_deref(), step)? {
                step.length = Some(n as u64);
                if n != data.len() {
                    return Err(format!("wrote {n} of {} bytes", data.len()));
                }
            }
        }
        Op::Read { len, expect } => {
            let mut dst = vec![0u8; *len];
            let n = expect_errno_of(s.fread(&mut dst), None, step)?.unwrap_or_default();
            step.length = Some(n as u64);
            if let Some(want) = expect
                && dst[..n] != *want.as_bytes()
            {
                return Err(format!(
                    "read \"{}\", expected \"{}\"",
                    dst[..n].escape_ascii(),
                    want.as_bytes().escape_ascii()
                ));
            }
        }
        Op::Seek {
            whence,
            offset,
            expect_errno,
        } => {
            let pos = match (*whence, u64::try_from(*offset)) {
                (Whence::Set, Ok(start)) => SeekFrom::Start(start),
                // A negative absolute target is expressed relative to the
                // cursor so the engine reports the out-of-range position.
                (Whence::Set, Err(_)) => {
                    let cur = s.ftell().map_err(|e| e.to_string())?;
                    SeekFrom::Current(offset.saturating_sub(i64::try_from(cur).unwrap_or(i64::MAX)))
                }
                (Whence::Cur, _) => SeekFrom::Current(*offset),
                (Whence::End, _) => SeekFrom::End(*offset),
            };
            expect_errno_of(s.fseek(pos), expect_errno.as_deref(), step)?;
        }
        Op::Tell { expect } => {
            let pos = expect_errno_of(s.ftell(), None, step)?.unwrap_or_default();
            if pos != *expect {
                return Err(format!("tell {pos}, expected {expect}"));
            }
        }
        Op::Flush { expect_errno } => {
            expect_errno_of(s.fflush(), expect_errno.as_deref(), step)?;
        }
        Op::Putc { byte } => {
            expect_errno_of(s.fputc(*byte), None, step)?;
            step.length = Some(1);
        }
        Op::Getc { expect } => {
            let got = expect_errno_of(s.fgetc(), None, step)?.flatten();
            if got != *expect {
                return Err(format!("getc {got:?}, expected {expect:?}"));
            }
        }
        Op::Ungetc { byte } => {
            if !s.ungetc(*byte) {
                return Err("push-back refused".to_string());
            }
        }
        Op::Rewind => {
            expect_errno_of(s.rewind(), None, step)?;
        }
        Op::Verify { expect } => {
            let handle = s.get_ref();
            let published = handle.and_then(Published::published);
            step.length = published.map(|b| b.len() as u64);
            check_state(published, expect)?;
            if !handle.is_none_or(Published::well_formed) {
                return Err("published buffer is not well formed".to_string());
            }
        }
        // The caller owns the stream and performs the close itself.
        Op::Close { .. } => {}
    }
    step.offset = s.ftell().ok();
    Ok(())
}

fn check_state(published: Option<&[u8]>, expected: &ExpectedState) -> Result<(), String> {
    if let Some(null) = expected.null
        && published.is_none() != null
    {
        return Err(format!("handle null={}, expected null={null}", published.is_none()));
    }
    if let Some(content) = &expected.content
        && published != Some(content.as_bytes())
    {
        return Err(format!(
            "content {}, expected \"{}\"",
            published.map_or_else(
                || "<null>".to_string(),
                |b| format!("\"{}\"", b.escape_ascii())
            ),
            content.as_bytes().escape_ascii()
        ));
    }
    if let Some(len) = expected.len {
        let got = published.map_or(0, <[u8]>::len);
        if got != len {
            return Err(format!("length {got}, expected {len}"));
        }
    }
    Ok(())
}

fn finish<H: Published>(handle: &H, expected: &ExpectedState, result: &mut ScenarioResult) {
    result.final_content = handle.published().map(<[u8]>::to_vec);
    result.failures = result.steps.iter().filter_map(|s| s.failure.clone()).collect();
    if let Err(msg) = check_state(handle.published(), expected) {
        result.failures.push(format!("final: {msg}"));
    }
    if !handle.well_formed() {
        result.failures.push("final: buffer is not well formed".to_string());
    }
    result.passed = result.failures.is_empty();
}
