//! Writer and interpreter benchmarks
//!
//! Run with: `cargo bench --bench writer_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pdfgraph::content::{DisplayList, Interpreter};
use pdfgraph::geometry::Rectangle;
use pdfgraph::writer::{DeviceColor, StandardFont};
use pdfgraph::{DocumentWriter, PdfDocument, WriterConfig};

fn build_document(pages: usize, compress: bool) -> Vec<u8> {
    let mut doc = DocumentWriter::new(WriterConfig::default().with_compression(compress));
    for i in 0..pages {
        let mut page = doc.add_page(Rectangle::letter());
        page.set_font(StandardFont::Helvetica, 10.0);
        for line in 0..40 {
            let y = 750.0 - line as f64 * 16.0;
            let _ = page.draw_text(50.0, y, &format!("Page {i} line {line}: benchmark text"));
        }
        for k in 0..20 {
            page.set_fill_color(DeviceColor::Gray(k as f64 / 20.0))
                .rect(50.0 + k as f64 * 20.0, 50.0, 15.0, 15.0)
                .fill();
        }
    }
    doc.finish().unwrap_or_default()
}

fn bench_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer");
    for pages in [1usize, 10, 50] {
        group.bench_with_input(BenchmarkId::new("compressed", pages), &pages, |b, &pages| {
            b.iter(|| build_document(black_box(pages), true))
        });
        group.bench_with_input(BenchmarkId::new("plain", pages), &pages, |b, &pages| {
            b.iter(|| build_document(black_box(pages), false))
        });
    }
    group.finish();
}

fn bench_read_and_interpret(c: &mut Criterion) {
    let bytes = build_document(10, true);
    c.bench_function("read_and_interpret_10_pages", |b| {
        b.iter(|| {
            let Ok(document) = PdfDocument::from_bytes(black_box(bytes.clone())) else {
                return 0;
            };
            let mut items = 0;
            for (i, page) in document.pages().iter().enumerate() {
                let Ok(content) = document.page_content(i) else {
                    continue;
                };
                let mut surface = DisplayList::new();
                if Interpreter::new(&document)
                    .run_page(page, &content, &mut surface)
                    .is_ok()
                {
                    items += surface.items().len();
                }
            }
            items
        })
    });
}

criterion_group!(benches, bench_writer, bench_read_and_interpret);
criterion_main!(benches);
