use criterion::{Criterion, criterion_group, criterion_main};
use domain::{OrderService, validate_order};
use order_store::InMemoryOrderStore;
use serde_json::{Value, json};

fn lunch_order(lines: usize) -> Value {
    let items: Vec<Value> = (0..lines)
        .map(|i| json!({"name": format!("Dish {i}"), "quantity": 2, "price": 45.5}))
        .collect();
    json!({
        "studentName": "Juan Dela Cruz",
        "studentId": "2021-00123",
        "items": items,
        "total": 91 * lines,
        "paymentMethod": "Cash"
    })
}

fn bench_validate(c: &mut Criterion) {
    let small = lunch_order(1);
    let large = lunch_order(50);

    c.bench_function("domain/validate_1_item", |b| {
        b.iter(|| validate_order(&small).unwrap());
    });
    c.bench_function("domain/validate_50_items", |b| {
        b.iter(|| validate_order(&large).unwrap());
    });
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = OrderService::new(InMemoryOrderStore::new());
    let candidate = lunch_order(3);

    c.bench_function("domain/create_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.create(&candidate).await.unwrap();
            });
        });
    });
}

fn bench_full_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = OrderService::new(InMemoryOrderStore::new());
    let candidate = lunch_order(3);

    c.bench_function("domain/create_accept_ready_complete", |b| {
        b.iter(|| {
            rt.block_on(async {
                let order = service.create(&candidate).await.unwrap();
                service.accept(&order.id).await.unwrap();
                service.mark_ready(&order.id).await.unwrap();
                service.complete(&order.id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_validate,
    bench_create_order,
    bench_full_lifecycle,
);
criterion_main!(benches);
