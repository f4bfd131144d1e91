use axum::Router;
use axum::http::Request;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use money_buddy::testing::{SquareEvent, sign_body};
use money_buddy::webhooks::verify;
use money_buddy::{App, ConfigBuilder, RateLimitConfig};
use tower::ServiceExt;

const SECRET: &str = "bench-signature-key";

fn payload(padding: usize) -> Vec<u8> {
    SquareEvent::payment_created("pay_bench", "COMPLETED", 1000)
        .with_object(
            "payment",
            serde_json::json!({
                "id": "pay_bench",
                "status": "COMPLETED",
                "amount_money": {"amount": 1000, "currency": "USD"},
                "note": "x".repeat(padding),
            }),
        )
        .to_bytes()
}

fn benchmark_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify");

    for padding in [0usize, 4096, 65536] {
        let body = payload(padding);
        let signature = sign_body(SECRET, &body);

        group.bench_with_input(BenchmarkId::new("valid", body.len()), &body, |b, body| {
            b.iter(|| verify(black_box(body), black_box(&signature), SECRET));
        });
    }

    let body = payload(0);
    group.bench_function("malformed_signature", |b| {
        b.iter(|| verify(black_box(&body), black_box("not base64!"), SECRET));
    });

    group.finish();
}

fn webhook_router() -> Router {
    let config = ConfigBuilder::new()
        .with_signature_key(SECRET)
        .with_rate_limit(RateLimitConfig::builder().enabled(false).build())
        .build()
        .unwrap();
    App::with_config(config).into_router().unwrap()
}

async fn deliver(router: &Router, body: &[u8], signature: &str) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhooks/square")
        .header("x-square-hmacsha256-signature", signature)
        .body(axum::body::Body::from(body.to_vec()))
        .unwrap();

    let _response = router.clone().oneshot(req).await.unwrap();
}

fn benchmark_delivery(c: &mut Criterion) {
    let mut group = c.benchmark_group("delivery");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let router = webhook_router();

    // Unknown type: full stack without ledger growth
    let body = SquareEvent::new("foo.bar").to_bytes();
    let signature = sign_body(SECRET, &body);

    group.bench_function("acknowledged", |b| {
        b.iter(|| rt.block_on(deliver(black_box(&router), &body, &signature)));
    });

    group.bench_function("rejected", |b| {
        b.iter(|| rt.block_on(deliver(black_box(&router), &body, "AAAA")));
    });

    group.finish();
}

criterion_group!(benches, benchmark_verify, benchmark_delivery);
criterion_main!(benches);
