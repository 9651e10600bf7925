//! HTML preview pages for shared files

use async_trait::async_trait;
use mime_guess::mime::Mime;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::share_id::ShareId;

/// Shown in place of text content that could not be read
pub const UNREADABLE_PLACEHOLDER: &str = "Could not read file.";

const PAGE_STYLE: &str = r#"<style>
  body { font-family: Arial, sans-serif; background-color: #f2f2f2; margin: 0; padding: 0; }
  .container { text-align: center; margin: 50px auto; max-width: 800px; background-color: #fff;
               padding: 20px; box-shadow: 0 0 10px rgba(0,0,0,0.1); }
  .download-button { display: inline-block; padding: 10px 20px; margin-top: 20px;
                     background-color: #007BFF; color: #fff; text-decoration: none; border-radius: 4px;
                     transition: background-color 0.3s ease; }
  .download-button:hover { background-color: #0056b3; }
  .notice { color: #777; font-style: italic; }
</style>"#;

/// Coarse media class that decides which viewer a preview page embeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
    Text,
    Other,
}

impl MediaKind {
    pub fn of(mime: &Mime) -> Self {
        match mime.type_().as_str() {
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            "image" => MediaKind::Image,
            "text" => MediaKind::Text,
            _ => MediaKind::Other,
        }
    }
}

/// Guess a MIME type from the file extension
///
/// Unknown extensions map to `application/octet-stream`.
pub fn mime_for(path: &Path) -> Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}

/// Text content loaded for a preview page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPreview {
    /// The whole file
    Complete(String),
    /// The first `limit` bytes of a larger file
    Truncated(String),
    /// The file could not be read
    Unreadable,
}

/// Source of file bytes for text previews
#[async_trait]
pub trait PreviewSource: Send + Sync {
    /// Read at most `limit` bytes from the start of the file
    async fn read_prefix(&self, path: &Path, limit: u64) -> std::io::Result<Vec<u8>>;
}

/// Default preview source reading through `tokio::fs`
#[derive(Debug, Clone, Default)]
pub struct TokioPreviewSource;

#[async_trait]
impl PreviewSource for TokioPreviewSource {
    async fn read_prefix(&self, path: &Path, limit: u64) -> std::io::Result<Vec<u8>> {
        let file = tokio::fs::File::open(path).await?;
        let mut buffer = Vec::new();
        file.take(limit).read_to_end(&mut buffer).await?;
        Ok(buffer)
    }
}

/// Read up to `limit` bytes of a text file for previewing
///
/// # Arguments
/// * `source` - Where the bytes come from
/// * `path` - File to preview
/// * `limit` - Maximum number of bytes to show
///
/// # Returns
/// * `TextPreview::Complete` - The file fit within `limit`
/// * `TextPreview::Truncated` - Only the first `limit` bytes are included
/// * `TextPreview::Unreadable` - The read failed; the page shows a placeholder
///
/// Invalid UTF-8 is replaced rather than rejected.
pub async fn load_text(source: &dyn PreviewSource, path: &Path, limit: u64) -> TextPreview {
    // One extra byte tells us whether the file goes past the limit
    let mut buffer = match source.read_prefix(path, limit.saturating_add(1)).await {
        Ok(buffer) => buffer,
        Err(e) => {
            tracing::warn!("Failed to read {} for preview: {}", path.display(), e);
            return TextPreview::Unreadable;
        }
    };

    let truncated = buffer.len() as u64 > limit;
    if truncated {
        buffer.truncate(limit as usize);
    }
    let text = String::from_utf8_lossy(&buffer).into_owned();

    if truncated {
        TextPreview::Truncated(text)
    } else {
        TextPreview::Complete(text)
    }
}

/// Render the preview page for a share
///
/// # Arguments
/// * `id` - Share the page belongs to; used for the inline and download links
/// * `file_name` - Name shown in the title and heading
/// * `mime` - Detected type deciding which viewer is embedded
/// * `text` - Loaded content for text files; ignored for other kinds
///
/// # Returns
/// * A complete HTML document. A text file without loaded content
///   renders the placeholder.
pub fn render_page(id: &ShareId, file_name: &str, mime: &Mime, text: Option<&TextPreview>) -> String {
    let name = escape_html(file_name);
    let media_type = escape_html(mime.essence_str());

    let viewer = match MediaKind::of(mime) {
        MediaKind::Video => format!(
            r#"<video controls style="max-width:100%; height:auto;">
        <source src="/file/{id}" type="{media_type}">
        Your browser does not support the video tag.
      </video>"#
        ),
        MediaKind::Audio => format!(
            r#"<audio controls style="width:100%;">
        <source src="/file/{id}" type="{media_type}">
        Your browser does not support the audio element.
      </audio>"#
        ),
        MediaKind::Image => format!(
            r#"<img src="/file/{id}" alt="Image preview" style="max-width:100%; height:auto;">"#
        ),
        MediaKind::Text => text_block(text.unwrap_or(&TextPreview::Unreadable)),
        MediaKind::Other => return page(&name, "", id),
    };

    page(&format!("Preview: {}", name), &viewer, id)
}

fn text_block(text: &TextPreview) -> String {
    let (content, notice) = match text {
        TextPreview::Complete(content) => (escape_html(content), ""),
        TextPreview::Truncated(content) => (
            escape_html(content),
            r#"<p class="notice">Preview truncated. Download the file to see all of it.</p>"#,
        ),
        TextPreview::Unreadable => (UNREADABLE_PLACEHOLDER.to_string(), ""),
    };
    format!(r#"<pre style="text-align:left; white-space: pre-wrap;">{content}</pre>{notice}"#)
}

fn page(title: &str, viewer: &str, id: &ShareId) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title>{PAGE_STYLE}</head>
<body>
  <div class="container">
    <h1>{title}</h1>
    {viewer}
    <br>
    <a href="/download/{id}" class="download-button">Download file</a>
  </div>
</body>
</html>
"#
    )
}

pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mime_guess::mime;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn render(name: &str, text: Option<&TextPreview>) -> (ShareId, String) {
        let id = ShareId::generate();
        let mime = mime_for(Path::new(name));
        (id, render_page(&id, name, &mime, text))
    }

    #[test]
    fn test_media_kind_dispatch() {
        assert_eq!(MediaKind::of(&mime_for(Path::new("a.mp4"))), MediaKind::Video);
        assert_eq!(MediaKind::of(&mime_for(Path::new("a.mp3"))), MediaKind::Audio);
        assert_eq!(MediaKind::of(&mime_for(Path::new("a.png"))), MediaKind::Image);
        assert_eq!(MediaKind::of(&mime_for(Path::new("a.txt"))), MediaKind::Text);
        assert_eq!(MediaKind::of(&mime_for(Path::new("a.bin"))), MediaKind::Other);
        assert_eq!(MediaKind::of(&mime_for(Path::new("noext"))), MediaKind::Other);
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        assert_eq!(mime_for(Path::new("archive.bin")), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn test_video_page() {
        let (id, html) = render("clip.mp4", None);
        assert!(html.contains("<title>Preview: clip.mp4</title>"));
        assert!(html.contains("<video controls"));
        assert!(html.contains(&format!(r#"<source src="/file/{}" type="video/mp4">"#, id)));
        assert!(html.contains("does not support the video tag"));
        assert!(html.contains(&format!(r#"href="/download/{}""#, id)));
    }

    #[test]
    fn test_audio_page() {
        let (id, html) = render("song.mp3", None);
        assert!(html.contains("<audio controls"));
        assert!(html.contains(&format!(r#"src="/file/{}""#, id)));
        assert!(html.contains("does not support the audio element"));
        assert!(!html.contains("<video"));
    }

    #[test]
    fn test_image_page() {
        let (id, html) = render("a.png", None);
        assert!(html.contains(&format!(r#"<img src="/file/{}""#, id)));
        assert!(html.contains(&format!(r#"href="/download/{}""#, id)));
    }

    #[test]
    fn test_text_page() {
        let text = TextPreview::Complete("hello".to_string());
        let (_, html) = render("notes.txt", Some(&text));
        assert!(html.contains(">hello</pre>"));
        assert!(!html.contains("Preview truncated"));
    }

    #[test]
    fn test_text_page_escapes_content() {
        let text = TextPreview::Complete("<script>alert('x')</script>".to_string());
        let (_, html) = render("page.txt", Some(&text));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
    }

    #[test]
    fn test_text_page_unreadable() {
        let (_, html) = render("notes.txt", Some(&TextPreview::Unreadable));
        assert!(html.contains(UNREADABLE_PLACEHOLDER));

        let (_, html) = render("notes.txt", None);
        assert!(html.contains(UNREADABLE_PLACEHOLDER));
    }

    #[test]
    fn test_text_page_truncated_notice() {
        let text = TextPreview::Truncated("abc".to_string());
        let (_, html) = render("big.txt", Some(&text));
        assert!(html.contains(">abc</pre>"));
        assert!(html.contains("Preview truncated"));
    }

    #[test]
    fn test_other_page_has_only_download_link() {
        let (id, html) = render("archive.bin", None);
        assert!(html.contains("<title>archive.bin</title>"));
        assert!(!html.contains("<video"));
        assert!(!html.contains("<audio"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("<pre"));
        assert!(!html.contains(&format!("/file/{}", id)));
        assert!(html.contains(&format!(r#"href="/download/{}""#, id)));
    }

    #[test]
    fn test_file_name_is_escaped() {
        let (_, html) = render("<b>x</b>.bin", None);
        assert!(html.contains("<title>&lt;b&gt;x&lt;/b&gt;.bin</title>"));
    }

    #[tokio::test]
    async fn test_load_text_complete() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "hello").unwrap();
        assert_eq!(
            load_text(&TokioPreviewSource, file.path(), 1024).await,
            TextPreview::Complete("hello".to_string())
        );
    }

    #[tokio::test]
    async fn test_load_text_exact_limit_is_complete() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "hello").unwrap();
        assert_eq!(
            load_text(&TokioPreviewSource, file.path(), 5).await,
            TextPreview::Complete("hello".to_string())
        );
    }

    #[tokio::test]
    async fn test_load_text_truncates() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "hello world").unwrap();
        assert_eq!(
            load_text(&TokioPreviewSource, file.path(), 5).await,
            TextPreview::Truncated("hello".to_string())
        );
    }

    #[tokio::test]
    async fn test_load_text_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[b'o', b'k', 0xff]).unwrap();
        match load_text(&TokioPreviewSource, file.path(), 1024).await {
            TextPreview::Complete(text) => assert!(text.starts_with("ok")),
            other => panic!("unexpected preview: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_text_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            load_text(&TokioPreviewSource, &dir.path().join("gone.txt"), 1024).await,
            TextPreview::Unreadable
        );
    }
}
