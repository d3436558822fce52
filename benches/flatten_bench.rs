use criterion::{criterion_group, criterion_main, Criterion};
use slideflat::rendering::StaticDocument;
use slideflat::{decode, EncodeCache, Flattener, StaticSurface, Viewport};
use std::sync::Arc;

fn sample_slide(items: usize) -> String {
    let mut html = String::from(
        "<div style=\"width:960px;height:540px;background:#102030\">\
         <style>h2 { color: white } li { font-size: 18px }</style>\
         <h2>Benchmark slide</h2><ul>",
    );
    for i in 0..items {
        html.push_str(&format!("<li><b>Point {}</b> with <i>detail</i></li>", i));
    }
    html.push_str("</ul></div>");
    html
}

fn bench_render(c: &mut Criterion) {
    let slide = sample_slide(20);
    c.bench_function("static_render", |b| {
        b.iter(|| StaticDocument::render(&slide, Viewport::default()))
    });
}

fn bench_encode_uncached(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("failed to build runtime");
    let slide = sample_slide(20);
    let flattener = Flattener::new(StaticSurface::new(Viewport::default()));

    c.bench_function("encode_uncached", |b| {
        b.iter(|| {
            flattener.cache().clear();
            rt.block_on(flattener.encode(&slide))
        })
    });
}

fn bench_encode_cached(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("failed to build runtime");
    let slide = sample_slide(20);
    let flattener = Flattener::new(StaticSurface::new(Viewport::default()))
        .with_cache(Arc::new(EncodeCache::new(16)));
    rt.block_on(flattener.encode(&slide));

    c.bench_function("encode_cached", |b| {
        b.iter(|| rt.block_on(flattener.encode(&slide)))
    });
}

fn bench_decode(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("failed to build runtime");
    let flattener = Flattener::new(StaticSurface::new(Viewport::default()));
    let slide = rt.block_on(flattener.encode(&sample_slide(20)));

    c.bench_function("decode", |b| b.iter(|| decode(&slide.units)));
}

criterion_group!(
    benches,
    bench_render,
    bench_encode_uncached,
    bench_encode_cached,
    bench_decode
);
criterion_main!(benches);
