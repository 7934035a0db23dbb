use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::render::{DocumentRenderer, RenderError};
use crate::services::{Principal, ReportService, RequestService, ServiceResult};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const PNG_CONTENT_TYPE: &str = "image/png";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Rendered document ready to be sent as a download
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// `Solicitud_<number>_<yyyymmdd>.<ext>`
pub fn request_file_name(number: &str, at: DateTime<Utc>, extension: &str) -> String {
    format!("Solicitud_{}_{}.{}", number, at.format("%Y%m%d"), extension)
}

/// Request documents and the report workbook
#[derive(Clone)]
pub struct ExportService {
    requests: RequestService,
    reports: ReportService,
    renderer: Arc<dyn DocumentRenderer>,
}

impl ExportService {
    pub fn new(requests: RequestService, reports: ReportService, renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self {
            requests,
            reports,
            renderer,
        }
    }

    /// Rendering is CPU work; keep it off the async workers
    async fn render<F>(&self, job: F) -> ServiceResult<Vec<u8>>
    where
        F: FnOnce(&dyn DocumentRenderer) -> Result<Vec<u8>, RenderError> + Send + 'static,
    {
        let renderer = self.renderer.clone();
        let bytes = tokio::task::spawn_blocking(move || job(renderer.as_ref()))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;
        Ok(bytes)
    }

    pub async fn request_pdf(&self, id: i32, principal: &Principal) -> ServiceResult<ExportedFile> {
        let view = self.requests.export_view(id, principal).await?;
        let now = Utc::now();
        let file_name = request_file_name(&view.request.number, now, "pdf");

        let bytes = self.render(move |r| r.render_pdf(&view, now)).await?;
        info!("User {} exported {} ({} bytes)", principal.user_id, file_name, bytes.len());
        Ok(ExportedFile {
            file_name,
            content_type: PDF_CONTENT_TYPE,
            bytes,
        })
    }

    pub async fn request_png(&self, id: i32, principal: &Principal) -> ServiceResult<ExportedFile> {
        let view = self.requests.export_view(id, principal).await?;
        let now = Utc::now();
        let file_name = request_file_name(&view.request.number, now, "png");

        let bytes = self.render(move |r| r.render_png(&view, now)).await?;
        info!("User {} exported {} ({} bytes)", principal.user_id, file_name, bytes.len());
        Ok(ExportedFile {
            file_name,
            content_type: PNG_CONTENT_TYPE,
            bytes,
        })
    }

    /// All reports in one workbook; administrators only
    pub async fn reports_workbook(&self, principal: &Principal) -> ServiceResult<ExportedFile> {
        let bundle = self.reports.bundle(principal).await?;
        let now = Utc::now();
        let file_name = format!("Reporte_Solicitudes_{}.csv", now.format("%Y%m%d"));

        let bytes = self.render(move |r| r.render_workbook(&bundle, now)).await?;
        info!("User {} exported the report workbook", principal.user_id);
        Ok(ExportedFile {
            file_name,
            content_type: CSV_CONTENT_TYPE,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use crate::render::BasicRenderer;
    use crate::services::{NewRequestInput, ServiceError};
    use crate::testing::TestContext;
    use crate::types::Priority;
    use chrono::TimeZone;

    fn exports(ctx: &TestContext) -> ExportService {
        ExportService::new(
            ctx.requests(),
            ctx.reports(),
            Arc::new(BasicRenderer::new(ExportConfig::default())),
        )
    }

    async fn hardware_request(ctx: &TestContext) -> i32 {
        let alice = ctx.as_principal(&ctx.demo.alice);
        let input = NewRequestInput {
            type_id: ctx.demo.hardware.id,
            subject: "Docking station".into(),
            description: "No video output".into(),
            priority: Priority::High,
            attachment: None,
        };
        ctx.requests().create(&alice, input).await.unwrap().id
    }

    #[test]
    fn file_names_carry_number_and_date() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(
            request_file_name("SOL-2026-0004", at, "pdf"),
            "Solicitud_SOL-2026-0004_20260309.pdf"
        );
    }

    #[tokio::test]
    async fn requester_and_area_agents_may_export() {
        let ctx = TestContext::new().await.unwrap();
        let id = hardware_request(&ctx).await;
        let service = exports(&ctx);

        let pdf = service.request_pdf(id, &ctx.as_principal(&ctx.demo.alice)).await.unwrap();
        assert_eq!(pdf.content_type, PDF_CONTENT_TYPE);
        assert!(pdf.bytes.starts_with(b"%PDF-"));
        assert!(String::from_utf8_lossy(&pdf.bytes).contains("(Name: Alice) Tj"));

        let png = service.request_png(id, &ctx.as_principal(&ctx.demo.it_agent)).await.unwrap();
        assert!(png.file_name.ends_with(".png"));
        assert!(png.bytes.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn strangers_are_refused_before_rendering() {
        let ctx = TestContext::new().await.unwrap();
        let id = hardware_request(&ctx).await;
        let service = exports(&ctx);

        for stranger in [&ctx.demo.bob, &ctx.demo.hr_agent] {
            assert!(matches!(
                service.request_pdf(id, &ctx.as_principal(stranger)).await,
                Err(ServiceError::UnauthorizedAction(_))
            ));
        }
        assert!(matches!(
            service.request_png(9999, &ctx.as_principal(&ctx.demo.alice)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn workbook_is_admin_only() {
        let ctx = TestContext::new().await.unwrap();
        hardware_request(&ctx).await;
        let service = exports(&ctx);

        assert!(matches!(
            service.reports_workbook(&ctx.as_principal(&ctx.demo.it_agent)).await,
            Err(ServiceError::UnauthorizedAction(_))
        ));

        let file = service.reports_workbook(&ctx.as_principal(&ctx.demo.admin)).await.unwrap();
        assert!(file.content_type.starts_with("text/csv"));
        let text = String::from_utf8(file.bytes).unwrap();
        assert!(text.starts_with("# Summary\n"));
        assert!(text.contains("Total requests,1\n"));
    }
}
