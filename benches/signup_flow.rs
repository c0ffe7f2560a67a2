use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

use async_trait::async_trait;
use signup_rs::models::SignupRecord;
use signup_rs::repositories::InMemorySignupRepository;
use signup_rs::services::{NotificationSettings, Notifier, NotifierError, SignupService};

/// Notifier that discards messages so the bench measures the signup path only
struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn publish(
        &self,
        _topic: &str,
        _message: &str,
        _subject: &str,
    ) -> Result<(), NotifierError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "null"
    }
}

fn form_body(index: usize, extra_fields: usize) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("email", &format!("user{}@example.com", index));
    serializer.append_pair("feedback", "looking forward to it");
    for field in 0..extra_fields {
        serializer.append_pair(&format!("field{}", field), "value");
    }
    serializer.finish()
}

fn bench_form_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("form_parsing");

    for extra_fields in [0, 8, 32] {
        let body = form_body(0, extra_fields);
        group.bench_with_input(
            BenchmarkId::from_parameter(extra_fields),
            &body,
            |b, body| b.iter(|| SignupRecord::from_form(black_box(body.as_bytes()))),
        );
    }

    group.finish();
}

fn bench_register(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = SignupService::new(
        Arc::new(InMemorySignupRepository::new("email")),
        Arc::new(NullNotifier),
        NotificationSettings::default(),
    );

    let mut index = 0usize;
    c.bench_function("register_new_signup", |b| {
        b.iter(|| {
            index += 1;
            let record = SignupRecord::from_form(form_body(index, 2).as_bytes());
            rt.block_on(async { black_box(service.register(record).await.is_ok()) })
        })
    });
}

criterion_group!(benches, bench_form_parsing, bench_register);
criterion_main!(benches);
