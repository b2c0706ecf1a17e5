//! Native-print handoff.
//!
//! The print document is a self-contained HTML page: `@page` pins the physical
//! size, and a scaler container carries the uniform shrink factor with
//! `transform-origin: top center`. A small script waits for fonts and images to
//! settle before opening the print dialog. Hosts receive the document through
//! the `PrintHost` trait; the default host spools it to disk.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::export::ExportError;
use crate::layout::geometry::PageGeometry;
use crate::layout::visual_tree::{Node, VisualTree};

const READY_SCRIPT: &str = r#"(function () {
  var images = Array.prototype.slice.call(document.images).map(function (img) {
    return img.complete ? Promise.resolve() : new Promise(function (done) {
      img.onload = img.onerror = done;
    });
  });
  var fonts = document.fonts ? document.fonts.ready : Promise.resolve();
  Promise.all([fonts].concat(images)).then(function () { window.print(); });
})();"#;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Builds the print document. `scale_factor` is `None` for flowing multi-page
/// output, where the print engine paginates at natural size.
pub fn build_print_document(
    tree: &VisualTree,
    geometry: PageGeometry,
    scale_factor: Option<f32>,
    title: &str,
) -> String {
    let mut html = String::new();
    let page_rule = match scale_factor {
        Some(_) => format!(
            "#print-page {{ width: {w}mm; height: {h}mm; overflow: hidden; }}",
            w = geometry.width_mm,
            h = geometry.height_mm
        ),
        None => format!("#print-page {{ width: {w}mm; }}", w = geometry.width_mm),
    };
    let scale = scale_factor.unwrap_or(1.0);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
@page {{ size: {size}; margin: 0; }}
html, body {{ margin: 0; padding: 0; background: #fff; }}
{page_rule}
#print-scaler {{ position: relative; width: {width}px; height: {height}px; margin: 0 auto; transform: scale({scale}); transform-origin: top center; }}
.n {{ position: absolute; white-space: pre; margin: 0; }}
.i {{ font-style: italic; }}
</style>
</head>
<body>
<div id="print-page">
<div id="print-scaler">
"#,
        title = escape_html(title),
        size = geometry.css_size(),
        width = tree.width,
        height = tree.height,
    );

    for node in tree.nodes() {
        write_node(&mut html, node);
    }

    let _ = write!(html, "</div>\n</div>\n<script>\n{READY_SCRIPT}\n</script>\n</body>\n</html>\n");
    html
}

fn write_node(html: &mut String, node: &Node) {
    let _ = match node {
        Node::Text(run) => writeln!(
            html,
            r#"<p class="n{italic}" style="left:{x:.2}px;top:{y:.2}px;line-height:{lh:.2}px;font-size:{fs:.2}px;font-family:{family};font-weight:{weight};color:{color}">{text}</p>"#,
            italic = if run.italic { " i" } else { "" },
            x = run.x,
            y = run.y,
            lh = run.line_height,
            fs = run.font_px,
            family = escape_html(run.typeface.css_family()),
            weight = match run.weight {
                crate::layout::font_metrics::Weight::Regular => 400,
                crate::layout::font_metrics::Weight::Bold => 700,
            },
            color = run.color.hex(),
            text = escape_html(&run.text),
        ),
        Node::Rule {
            x,
            y,
            width,
            thickness,
            color,
        } => writeln!(
            html,
            r#"<div class="n" style="left:{x:.2}px;top:{y:.2}px;width:{width:.2}px;height:{thickness:.2}px;background:{c}"></div>"#,
            c = color.hex()
        ),
        Node::Rect {
            x,
            y,
            width,
            height,
            radius,
            color,
        } => writeln!(
            html,
            r#"<div class="n" style="left:{x:.2}px;top:{y:.2}px;width:{width:.2}px;height:{height:.2}px;border-radius:{radius:.2}px;background:{c}"></div>"#,
            c = color.hex()
        ),
        Node::Image {
            x,
            y,
            width,
            height,
            source,
        } => writeln!(
            html,
            r#"<img class="n" alt="" src="{src}" style="left:{x:.2}px;top:{y:.2}px;width:{width:.2}px;height:{height:.2}px;object-fit:cover">"#,
            src = escape_html(source)
        ),
    };
}

// ────────────────────────────────────────────────────────────────────────────
// Print hosts
// ────────────────────────────────────────────────────────────────────────────

pub struct PrintJob {
    pub export_id: Uuid,
    pub filename: String,
    pub html: String,
}

/// Where a host put a submitted document.
#[derive(Debug, Clone)]
pub struct PrintReceipt {
    pub path: PathBuf,
}

/// Receives finished print documents. Hosts may never confirm completion, so
/// the caller discards each receipt once the print window has passed.
#[async_trait]
pub trait PrintHost: Send + Sync {
    async fn submit(&self, job: PrintJob) -> Result<PrintReceipt, ExportError>;

    async fn discard(&self, receipt: &PrintReceipt) -> Result<(), ExportError>;
}

/// Writes print documents atomically into a spool directory.
pub struct SpoolPrintHost {
    dir: PathBuf,
}

impl SpoolPrintHost {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl PrintHost for SpoolPrintHost {
    async fn submit(&self, job: PrintJob) -> Result<PrintReceipt, ExportError> {
        let dir = self.dir.clone();
        let target_name = format!("{}-{}", job.export_id, job.filename);
        let location = tokio::task::spawn_blocking(move || -> Result<PathBuf, ExportError> {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(job.html.as_bytes())?;
            let target = dir.join(target_name);
            tmp.persist(&target)
                .map_err(|e| ExportError::Print(format!("could not spool {}: {}", target.display(), e.error)))?;
            Ok(target)
        })
        .await??;
        info!(location = %location.display(), "Print document spooled");
        Ok(PrintReceipt { path: location })
    }

    async fn discard(&self, receipt: &PrintReceipt) -> Result<(), ExportError> {
        match tokio::fs::remove_file(&receipt.path).await {
            Ok(()) => {
                debug!(location = %receipt.path.display(), "Spooled print document removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::renderer::render;
    use crate::layout::renderer::tests::sample_document;
    use crate::models::settings::RenderSettings;

    #[test]
    fn test_print_document_carries_page_and_scale() {
        let tree = render(&sample_document(), RenderSettings::default(), PageGeometry::A4);
        let html = build_print_document(&tree, PageGeometry::A4, Some(0.8), "Ada");
        assert!(html.contains("@page { size: A4; margin: 0; }"));
        assert!(html.contains("transform: scale(0.8)"));
        assert!(html.contains("transform-origin: top center"));
        assert!(html.contains("document.fonts.ready"));
        assert!(html.contains(">Ada Lovelace</p>"));
    }

    #[test]
    fn test_print_document_escapes_text() {
        let doc = crate::models::document::Document {
            name: "<script>alert(1)</script>".to_string(),
            ..Default::default()
        };
        let tree = render(&doc, RenderSettings::default(), PageGeometry::LETTER);
        let html = build_print_document(&tree, PageGeometry::LETTER, Some(1.0), &doc.name);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("size: letter"));
    }

    #[tokio::test]
    async fn test_spool_host_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let host = SpoolPrintHost::new(dir.path().join("spool"));
        let receipt = host
            .submit(PrintJob {
                export_id: Uuid::new_v4(),
                filename: "Ada.html".to_string(),
                html: "<html></html>".to_string(),
            })
            .await
            .unwrap();
        let name = receipt.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-Ada.html"));
        assert_eq!(std::fs::read_to_string(&receipt.path).unwrap(), "<html></html>");
    }

    #[tokio::test]
    async fn test_spool_host_discard_removes_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let host = SpoolPrintHost::new(dir.path().to_path_buf());
        let receipt = host
            .submit(PrintJob {
                export_id: Uuid::new_v4(),
                filename: "Ada.html".to_string(),
                html: "<html></html>".to_string(),
            })
            .await
            .unwrap();
        host.discard(&receipt).await.unwrap();
        assert!(!receipt.path.exists());
        // Already gone is not an error.
        host.discard(&receipt).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
