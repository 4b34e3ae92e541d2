use std::io;
use std::path::{Component, Path, PathBuf};

/// Absolute path for `<video_id>.<extension>` inside `output_dir`, creating the
/// directory. Existing files are never reused: `_1`, `_2`, ... is appended to
/// the stem until the name is free.
pub fn generate_output_path(
    output_dir: &Path,
    video_id: &str,
    extension: &str,
) -> io::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let mut candidate = output_dir.join(format!("{video_id}.{extension}"));
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = output_dir.join(format!("{video_id}_{counter}.{extension}"));
        counter += 1;
    }

    std::path::absolute(candidate)
}

/// Absolute path for a user-chosen file name inside `output_dir`. The name is
/// used as given, even if a file already exists there, but it must be a bare
/// file name: directories belong in `output_dir`.
pub fn explicit_output_path(output_dir: &Path, filename: &str) -> io::Result<PathBuf> {
    let mut components = Path::new(filename).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("`{filename}` is not a plain file name; use --output-dir for directories"),
        ));
    }

    std::fs::create_dir_all(output_dir)?;
    std::path::absolute(output_dir.join(filename))
}

/// Transcript path next to `video_path`: `talk.mp4` -> `talk_chat.<extension>`.
pub fn chat_transcript_path(video_path: &Path, extension: &str) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    video_path.with_file_name(format!("{stem}_chat.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn uses_video_id_as_file_name() {
        let dir = TempDir::new().unwrap();
        let path = generate_output_path(dir.path(), "abc123", "mp4").unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, dir.path().join("abc123.mp4"));
    }

    #[test]
    fn appends_counter_on_collision() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("abc.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("abc_1.mp4"), b"").unwrap();

        let path = generate_output_path(dir.path(), "abc", "mp4").unwrap();
        assert_eq!(path, dir.path().join("abc_2.mp4"));
    }

    #[test]
    fn creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let path = generate_output_path(&nested, "x", "mp4").unwrap();
        assert!(nested.is_dir());
        assert_eq!(path, nested.join("x.mp4"));
    }

    #[test]
    fn explicit_name_is_kept() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("talk.mp4"), b"old").unwrap();
        let path = explicit_output_path(dir.path(), "talk.mp4").unwrap();
        assert_eq!(path, dir.path().join("talk.mp4"));
    }

    #[rstest]
    #[case("/etc/x.mp4")]
    #[case("../x.mp4")]
    #[case("sub/x.mp4")]
    #[case(".")]
    #[case("")]
    fn explicit_name_must_be_plain(#[case] filename: &str) {
        let dir = TempDir::new().unwrap();
        let err = explicit_output_path(dir.path(), filename).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[rstest]
    #[case("/videos/talk.mp4", "txt", "/videos/talk_chat.txt")]
    #[case("/videos/a.b.mp4", "json", "/videos/a.b_chat.json")]
    #[case("/videos/talk", "html", "/videos/talk_chat.html")]
    fn chat_path_replaces_extension(
        #[case] video: &str,
        #[case] extension: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(
            chat_transcript_path(Path::new(video), extension),
            PathBuf::from(expected)
        );
    }
}
