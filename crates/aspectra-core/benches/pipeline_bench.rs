use criterion::{black_box, criterion_group, criterion_main, Criterion};
use aspectra_core::{AspectExtractor, Document, Tokenizer};

const ABSTRACT: &str = "Рассмотрены лагранжев бессеточный метод сглаженных частиц (SPH) и \
эйлеровы методы с использованием адаптивных сеток (AMR). Перечислены различные свойства \
этих подходов. Сделан вывод о применимости методов к задачам газовой динамики.";

fn tagged_abstract() -> Document {
    let tokenizer = Tokenizer::new().unwrap();
    let tokens = tokenizer.tokenize(ABSTRACT);
    let labels = tokens
        .iter()
        .map(|t| match t.text.as_str() {
            "лагранжев" | "эйлеровы" => "B-METHOD",
            "Перечислены" => "B-CONTRIBUTION",
            "вывод" => "B-CONCLUSION",
            "Рассмотрены" | "и" | "." => "O",
            _ => "I-METHOD",
        })
        .map(str::to_string)
        .collect();
    Document::new(ABSTRACT, tokens, labels).unwrap()
}

fn bench_extract(c: &mut Criterion) {
    let extractor = AspectExtractor::with_defaults();
    let doc = tagged_abstract();

    c.bench_function("extract_single", |b| {
        b.iter(|| extractor.extract_document(black_box(&doc)));
    });

    let batch: Vec<Document> = (0..256).map(|_| doc.clone()).collect();
    c.bench_function("extract_batch_256", |b| {
        b.iter(|| extractor.extract_batch(black_box(&batch)));
    });
}

fn bench_tokenize(c: &mut Criterion) {
    let tokenizer = Tokenizer::new().unwrap();
    c.bench_function("tokenize_abstract", |b| {
        b.iter(|| tokenizer.tokenize(black_box(ABSTRACT)));
    });
}

criterion_group!(benches, bench_extract, bench_tokenize);
criterion_main!(benches);
