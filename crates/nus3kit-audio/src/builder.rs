//! nus3audio container generation.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::convert::{has_extension, AudioConverter};
use crate::error::{AudioError, AudioResult};
use crate::process::{SystemRunner, ToolRunner};
use crate::tool::Nus3AudioTool;

/// Extension of inputs that are already containers and pass through.
pub const CONTAINER_EXTENSION: &str = "nus3audio";

/// Offset of the null-terminated tone name inside a container.
pub const TONE_NAME_OFFSET: usize = 0x48;

/// Input extensions converted before embedding, by default. Encoded
/// formats like lopus and idsp go straight to the container tool.
pub const DEFAULT_CONVERSION_EXTENSIONS: [&str; 4] = ["wav", "brstm", "bcstm", "bfstm"];

/// Builds .nus3audio container files, one tone per container.
///
/// Inputs that are containers already are copied through; inputs in a
/// decoder-only format are converted first; everything else is embedded
/// directly by the external container tool.
#[derive(Debug)]
pub struct Nus3AudioBuilder<R = SystemRunner> {
    tool: Nus3AudioTool<R>,
    converter: AudioConverter<R>,
    conversion_extensions: Vec<String>,
    temp_root: PathBuf,
}

impl<R: ToolRunner> Nus3AudioBuilder<R> {
    /// Creates a builder staging conversions under `temp_root`.
    pub fn new(
        tool: Nus3AudioTool<R>,
        converter: AudioConverter<R>,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool,
            converter,
            conversion_extensions: DEFAULT_CONVERSION_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            temp_root: temp_root.into(),
        }
    }

    /// Replaces the extension set that triggers conversion.
    pub fn conversion_extensions(mut self, extensions: Vec<String>) -> Self {
        self.conversion_extensions = extensions;
        self
    }

    /// Generates the container for `tone_id` from `input` at `output`.
    ///
    /// The container tool must exist before anything is touched. Staging
    /// files for converted inputs live in a scoped temp directory that is
    /// removed whether the embed succeeds or not.
    pub fn generate(&self, tone_id: &str, input: &Path, output: &Path) -> AudioResult<()> {
        self.tool.ensure_available()?;
        if !input.exists() {
            return Err(AudioError::InputMissing {
                path: input.to_path_buf(),
            });
        }

        debug!(
            "generating nus3audio for tone '{}' from {}",
            tone_id,
            input.display()
        );

        if has_extension(input, CONTAINER_EXTENSION) {
            return self.copy_container(tone_id, input, output);
        }

        if self.needs_conversion(input) {
            fs::create_dir_all(&self.temp_root)?;
            let staging = tempfile::Builder::new()
                .prefix("nus3kit-convert-")
                .tempdir_in(&self.temp_root)?;
            let staged = self.converter.convert(input, staging.path())?;
            return self.embed(tone_id, &staged, output);
        }

        self.embed(tone_id, input, output)
    }

    /// Passthrough for inputs that are already containers.
    ///
    /// The embedded tone name is compared for diagnostics only. Whether a
    /// mismatch should ever reject the copy is unresolved, so the check
    /// stays informational.
    fn copy_container(&self, tone_id: &str, input: &Path, output: &Path) -> AudioResult<()> {
        match embedded_tone_name(input) {
            Ok(Some(embedded)) if embedded != tone_id => warn!(
                "container {} carries tone name '{}', expected '{}'",
                input.display(),
                embedded,
                tone_id
            ),
            Ok(_) => {}
            Err(err) => debug!(
                "could not read tone name from {}: {}",
                input.display(),
                err
            ),
        }

        create_parent_dirs(output)?;
        fs::copy(input, output)?;
        debug!("copied container to {}", output.display());
        Ok(())
    }

    fn embed(&self, tone_id: &str, input: &Path, output: &Path) -> AudioResult<()> {
        create_parent_dirs(output)?;
        self.tool.new_container(output)?;
        self.tool.append(tone_id, input, output)?;
        debug!(
            "embedded {} as tone '{}' in {}",
            input.display(),
            tone_id,
            output.display()
        );
        Ok(())
    }

    fn needs_conversion(&self, input: &Path) -> bool {
        self.conversion_extensions
            .iter()
            .any(|ext| has_extension(input, ext))
    }
}

/// Reads the null-terminated tone name at [`TONE_NAME_OFFSET`].
///
/// Returns `None` for containers too short to hold a name, without a
/// terminator, or with non-UTF-8 name bytes; only real I/O problems error.
pub fn embedded_tone_name(container: &Path) -> AudioResult<Option<String>> {
    let bytes = fs::read(container)?;
    if bytes.len() <= TONE_NAME_OFFSET {
        return Ok(None);
    }

    let tail = &bytes[TONE_NAME_OFFSET..];
    let Some(nul) = tail.iter().position(|&b| b == 0) else {
        return Ok(None);
    };
    if nul == 0 {
        return Ok(None);
    }

    Ok(std::str::from_utf8(&tail[..nul]).ok().map(str::to_string))
}

fn create_parent_dirs(path: &Path) -> AudioResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::{FakeRunner, Invocation};
    use crate::process::ToolOutput;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn fake_builder(
        dir: &Path,
        tool_runner: FakeRunner,
        converter_runner: FakeRunner,
    ) -> Nus3AudioBuilder<FakeRunner> {
        let exe = dir.join("nus3audio");
        fs::write(&exe, b"").unwrap();
        Nus3AudioBuilder::new(
            Nus3AudioTool::with_runner(&exe, tool_runner),
            AudioConverter::with_runner("VGAudioCli", "lopus", "idsp", converter_runner),
            dir.join("temp"),
        )
    }

    /// Converter handler that writes its `-o` target.
    fn converting(invocation: &Invocation) -> AudioResult<ToolOutput> {
        fs::write(invocation.arg_path(3), b"converted").unwrap();
        Ok(ToolOutput {
            exit_code: Some(0),
            ..Default::default()
        })
    }

    fn synthetic_container(tone_name: &str) -> Vec<u8> {
        let mut bytes = vec![0u8; TONE_NAME_OFFSET];
        bytes.extend_from_slice(tone_name.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(b"streamdata");
        bytes
    }

    #[test]
    fn test_embedded_tone_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bgm.nus3audio");
        fs::write(&path, synthetic_container("bgm_old_song")).unwrap();

        assert_eq!(
            embedded_tone_name(&path).unwrap(),
            Some("bgm_old_song".to_string())
        );
    }

    #[test]
    fn test_embedded_tone_name_short_container() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.nus3audio");
        fs::write(&path, b"NUS3").unwrap();

        assert_eq!(embedded_tone_name(&path).unwrap(), None);
    }

    #[test]
    fn test_embedded_tone_name_unterminated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.nus3audio");
        let mut bytes = vec![0u8; TONE_NAME_OFFSET];
        bytes.extend_from_slice(b"no_terminator");
        fs::write(&path, bytes).unwrap();

        assert_eq!(embedded_tone_name(&path).unwrap(), None);
    }

    #[test]
    fn test_passthrough_copies_bytes_despite_mismatch() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bgm_old.nus3audio");
        let contents = synthetic_container("bgm_old_song");
        fs::write(&input, &contents).unwrap();
        let output = dir.path().join("out/bgm_new.nus3audio");

        let builder = fake_builder(dir.path(), FakeRunner::succeeding(), FakeRunner::succeeding());
        builder.generate("bgm_new_song", &input, &output).unwrap();

        assert_eq!(fs::read(&output).unwrap(), contents);
        assert_eq!(builder.tool.runner().call_count(), 0);
        assert_eq!(builder.converter.runner().call_count(), 0);
    }

    #[test]
    fn test_direct_embed_invokes_tool_twice() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.lopus");
        fs::write(&input, b"OPUS").unwrap();
        let output = dir.path().join("bgm.nus3audio");

        let builder = fake_builder(dir.path(), FakeRunner::succeeding(), FakeRunner::succeeding());
        builder.generate("bgm_tone", &input, &output).unwrap();

        let calls = builder.tool.runner().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args[0], "-n");
        assert_eq!(calls[1].args[0], "-A");
        assert_eq!(calls[1].args[1], "bgm_tone");
        assert_eq!(builder.converter.runner().call_count(), 0);
    }

    #[test]
    fn test_wav_input_converts_then_embeds() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut wav = hound::WavWriter::create(&input, spec).unwrap();
        for n in 0..64i16 {
            wav.write_sample(n * 256).unwrap();
        }
        wav.finalize().unwrap();
        let output = dir.path().join("bgm.nus3audio");

        let builder = fake_builder(
            dir.path(),
            FakeRunner::succeeding(),
            FakeRunner::with_handler(converting),
        );
        builder.generate("bgm_tone", &input, &output).unwrap();

        let convert_calls = builder.converter.runner().calls();
        assert_eq!(convert_calls.len(), 1);
        assert!(convert_calls[0].args[3].ends_with("staged.lopus"));

        let tool_calls = builder.tool.runner().calls();
        assert_eq!(tool_calls.len(), 2);
        assert!(tool_calls[1].args[2].ends_with("staged.lopus"));
    }

    #[test]
    fn test_staging_dir_removed_after_success() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.brstm");
        fs::write(&input, b"RSTM").unwrap();

        let builder = fake_builder(
            dir.path(),
            FakeRunner::succeeding(),
            FakeRunner::with_handler(converting),
        );
        builder
            .generate("bgm_tone", &input, &dir.path().join("bgm.nus3audio"))
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("temp")).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_staging_dir_removed_after_failure() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.brstm");
        fs::write(&input, b"RSTM").unwrap();

        let builder = fake_builder(dir.path(), FakeRunner::succeeding(), FakeRunner::failing());
        let err = builder
            .generate("bgm_tone", &input, &dir.path().join("bgm.nus3audio"))
            .unwrap_err();

        assert!(matches!(err, AudioError::ToolFailed { .. }));
        // Both attempts failed, zero tool calls, staging cleaned up.
        assert_eq!(builder.converter.runner().call_count(), 2);
        assert_eq!(builder.tool.runner().call_count(), 0);
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("temp")).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_missing_tool_aborts_before_any_work() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.lopus");
        fs::write(&input, b"OPUS").unwrap();

        let builder = Nus3AudioBuilder::new(
            Nus3AudioTool::with_runner(dir.path().join("absent"), FakeRunner::succeeding()),
            AudioConverter::with_runner("VGAudioCli", "lopus", "idsp", FakeRunner::succeeding()),
            dir.path().join("temp"),
        );
        let err = builder
            .generate("bgm_tone", &input, &dir.path().join("bgm.nus3audio"))
            .unwrap_err();

        assert!(matches!(err, AudioError::ToolNotFound { .. }));
        assert_eq!(builder.tool.runner().call_count(), 0);
    }

    #[test]
    fn test_missing_input_is_reported() {
        let dir = tempdir().unwrap();
        let builder = fake_builder(dir.path(), FakeRunner::succeeding(), FakeRunner::succeeding());
        let err = builder
            .generate(
                "bgm_tone",
                &dir.path().join("absent.wav"),
                &dir.path().join("bgm.nus3audio"),
            )
            .unwrap_err();
        assert!(matches!(err, AudioError::InputMissing { .. }));
    }

    #[test]
    fn test_conversion_extension_override() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.ogg");
        fs::write(&input, b"OggS").unwrap();

        let builder = fake_builder(
            dir.path(),
            FakeRunner::succeeding(),
            FakeRunner::with_handler(converting),
        )
        .conversion_extensions(vec!["ogg".to_string()]);
        builder
            .generate("bgm_tone", &input, &dir.path().join("bgm.nus3audio"))
            .unwrap();

        assert_eq!(builder.converter.runner().call_count(), 1);
    }
}
