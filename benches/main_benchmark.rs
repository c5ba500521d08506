use cinc::build::parse_make_rule;
use cinc::config::{CincConfig, ExtensionTable};
use cinc::path;
use cinc::registry::{self, FileFlags, Registry};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use toml;

const MOCK_CONFIG: &str = r#"
cc = "gcc"
diff = "diff"
flags = ["-g", "-fsanitize=address", "-Wall", "-Wextra", "-Werror"]
build = "build"
interval = 100
sources = ["src", "lib"]
tests = ["tests"]
"#;

const MOCK_RULE: &str = "main.o: src/main.c src/util.h \\\n src/io.h \\\n src/registry.h\n";

fn bench_config_parse(c: &mut Criterion) {
    c.bench_function("parse_cinc_toml", |b| {
        b.iter(|| {
            let _: CincConfig = toml::from_str(black_box(MOCK_CONFIG)).unwrap();
        })
    });
}

fn bench_canonicalize(c: &mut Criterion) {
    c.bench_function("canonicalize_relative", |b| {
        b.iter(|| {
            let _ = path::canonicalize_from(
                black_box("src/../src/./deep/nested/../file.c"),
                black_box("/home/user/project"),
                black_box(false),
            );
        })
    });

    c.bench_function("canonicalize_absolute", |b| {
        b.iter(|| {
            let _ = path::canonicalize_from(
                black_box("/home/user/project/src/main.c"),
                black_box("/home/user/project"),
                black_box(false),
            );
        })
    });
}

fn bench_registry_insert(c: &mut Criterion) {
    let config = CincConfig::default();
    c.bench_function("registry_insert_100", |b| {
        b.iter(|| {
            let mut reg = Registry::new();
            for i in 0..100 {
                let path = format!("src/file_{i}.c");
                reg.insert_or_update(
                    black_box(&path),
                    None,
                    FileFlags::empty(),
                    black_box(&config),
                )
                .unwrap();
            }
            reg
        })
    });

    let mut reg = Registry::new();
    for i in 0..1000 {
        reg.insert_or_update(&format!("src/file_{i}.c"), None, FileFlags::empty(), &config)
            .unwrap();
    }
    c.bench_function("registry_lookup", |b| {
        b.iter(|| {
            let _ = reg.find(black_box("src/file_500.c"));
            let _ = reg.find(black_box("src/file_999.c"));
            let _ = reg.find(black_box("src/missing.c"));
        })
    });
}

fn bench_glob(c: &mut Criterion) {
    c.bench_function("glob_compile", |b| {
        b.iter(|| {
            let _ = registry::glob_regex(black_box("src/*.c"));
            let _ = registry::glob_regex(black_box("build/**"));
            let _ = registry::glob_regex(black_box("tests/case_[0-9].input"));
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let table = ExtensionTable::default();
    c.bench_function("classify_extension", |b| {
        b.iter(|| {
            let _ = table.classify(black_box("c"));
            let _ = table.classify(black_box("h"));
            let _ = table.classify(black_box("o"));
            let _ = table.classify(black_box("txt"));
        })
    });
}

fn bench_make_rule(c: &mut Criterion) {
    c.bench_function("parse_make_rule", |b| {
        b.iter(|| parse_make_rule(black_box(MOCK_RULE)))
    });
}

criterion_group!(
    benches,
    bench_config_parse,
    bench_canonicalize,
    bench_registry_insert,
    bench_glob,
    bench_classify,
    bench_make_rule
);
criterion_main!(benches);
