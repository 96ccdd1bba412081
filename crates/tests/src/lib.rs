//! Fixtures shared by the HTTP integration tests.

use std::io::Cursor;

use axum::body::Body;
use axum::http::Request;
use farm_ml::{LinearWeights, FEATURE_DIMS};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

pub const BOUNDARY: &str = "farm-test-boundary";

pub fn chat_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn ask(question: &str) -> Request<Body> {
    chat_request(serde_json::json!({ "question": question }).to_string())
}

/// Two classes scored by mean redness and mean greenness.
pub fn red_is_fresh_weights() -> LinearWeights {
    let mut fresh = vec![0.0; FEATURE_DIMS];
    let mut rotten = vec![0.0; FEATURE_DIMS];
    for cell in 0..FEATURE_DIMS / 3 {
        fresh[cell * 3] = 0.1;
        rotten[cell * 3 + 1] = 0.1;
    }
    LinearWeights {
        class_names: vec!["freshtomato".to_string(), "rottentomato".to_string()],
        weights: vec![fresh, rotten],
        bias: vec![0.0, 0.0],
    }
}

pub fn solid_png(color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb(color)));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// One-part `multipart/form-data` body.
pub fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
