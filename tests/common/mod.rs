//! Shared fakes for the integration tests: a PDF builder, a rasterizer that
//! needs no external binary, a scripted oracle and a recording mailer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use lopdf::{Document, Object, Stream, dictionary};

use payslip_router::document::{CropArea, Rasterizer};
use payslip_router::error::{DocumentError, MailError, OracleError};
use payslip_router::mail::{Mailer, OutgoingPayslip};
use payslip_router::matching::Registry;
use payslip_router::oracle::{NameExtractor, VisionOracle};
use payslip_router::pipeline::{
    DispatchCoordinator, ExtractionCoordinator, ExtractionSettings, PayslipService,
};
use payslip_router::store::InMemoryProcessStore;
use payslip_router::template::CompanyTemplate;

/// Per-call oracle bound used by every test service.
pub const TEST_ORACLE_TIMEOUT: Duration = Duration::from_millis(200);

/// Upload limit used by every test service.
pub const TEST_MAX_UPLOAD: usize = 1024 * 1024;

/// Build an N-page PDF whose page n shows the text "Page n".
pub fn sample_pdf(pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for n in 1..=pages {
        let content = format!("BT /F1 24 Tf 72 720 Td (Page {n}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(i64::from(pages)),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Rasterizes by page count only: page n becomes a blank `n*10 x 20` image,
/// so the oracle can tell pages apart by width.
pub struct WidthCodedRasterizer;

#[async_trait]
impl Rasterizer for WidthCodedRasterizer {
    async fn rasterize(&self, document: &[u8], _dpi: u32) -> Result<Vec<DynamicImage>, DocumentError> {
        let pages = payslip_router::document::split::page_count(document)?;
        Ok((1..=pages)
            .map(|n| DynamicImage::ImageRgba8(RgbaImage::new(n * 10, 20)))
            .collect())
    }
}

/// What the scripted oracle does for one page.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    /// Never answers within the extractor timeout.
    Hang,
    Fail(&'static str),
    /// Answers after the given delay.
    Delayed(&'static str, Duration),
}

/// Oracle scripted per page. Pages without a script get an empty answer.
pub struct ScriptedOracle {
    replies: HashMap<u32, Reply>,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(replies: impl IntoIterator<Item = (u32, Reply)>) -> Arc<Self> {
        Arc::new(Self {
            replies: replies.into_iter().collect(),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl VisionOracle for ScriptedOracle {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn read_image(&self, png: &[u8], _instruction: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page = image::load_from_memory(png).unwrap().width() / 10;

        let result = match self.replies.get(&page).cloned() {
            Some(Reply::Text(text)) => Ok(text.to_string()),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("too late".to_string())
            }
            Some(Reply::Fail(reason)) => Err(OracleError::InvalidResponse {
                provider: "scripted".into(),
                reason: reason.into(),
            }),
            Some(Reply::Delayed(text, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(text.to_string())
            }
            None => Ok(String::new()),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// Records every payslip it is asked to send. Fails every send when
/// `failure` is set.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingPayslip>>,
    pub failure: Option<&'static str>,
}

impl RecordingMailer {
    pub fn failing(reason: &'static str) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(reason),
        })
    }

    pub fn sent(&self) -> Vec<OutgoingPayslip> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, payslip: &OutgoingPayslip) -> Result<String, MailError> {
        if let Some(reason) = self.failure {
            return Err(MailError::SendFailed {
                backend: "recording".into(),
                reason: reason.into(),
            });
        }
        self.sent.lock().unwrap().push(payslip.clone());
        Ok("Email sent successfully".into())
    }
}

/// A fully wired service around the fakes.
pub struct TestService {
    pub service: Arc<PayslipService>,
    pub store: Arc<InMemoryProcessStore>,
    pub oracle: Arc<ScriptedOracle>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn test_service(oracle: Arc<ScriptedOracle>, mailer: Arc<RecordingMailer>) -> TestService {
    let extractor = NameExtractor::new(oracle.clone()).with_timeout(TEST_ORACLE_TIMEOUT);
    let extraction = ExtractionCoordinator::new(
        Arc::new(WidthCodedRasterizer),
        Arc::new(extractor),
        ExtractionSettings {
            workers: 4,
            ..ExtractionSettings::default()
        },
    );
    let store = InMemoryProcessStore::new();
    let dispatch = DispatchCoordinator::new(store.clone(), mailer.clone(), "main");
    let service = Arc::new(PayslipService::new(
        extraction,
        dispatch,
        store.clone(),
        TEST_MAX_UPLOAD,
    ));

    TestService {
        service,
        store,
        oracle,
        mailer,
    }
}

pub fn registry() -> Registry {
    [("Aname", "a@x.com"), ("Bname Bsurname", "b@x.com")]
        .into_iter()
        .collect()
}

/// Crop covering any test page.
pub fn full_page() -> CropArea {
    CropArea::new(0, 0, 10_000, 10_000)
}

pub fn template() -> CompanyTemplate {
    CompanyTemplate {
        company_id: "main".into(),
        company_name: "Acme".into(),
        name_crop_area: full_page(),
        employee_emails: registry(),
        created_at: None,
        updated_at: None,
    }
}
