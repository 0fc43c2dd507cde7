//! Benchmarks for the script compile pipeline.
//!
//! - parse: source to AST
//! - compile: source to assembly, includes resolved in memory
//! - pipeline: compile, assemble and compress
//! - lookup: cache hits through the loader

use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;

use bumpalo::Bump;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use gsc_loader::{
    AssetDatabase, AssetType, BuildMode, CompileError, FileAccess, Pipeline, ScriptCompiler,
    ScriptLoader,
};
use gsc_parser::Parser;

const HELLO: &str = include_str!("../test_scripts/hello.gsc");
const GAMETYPE: &str = include_str!("../test_scripts/gametype.gsc");
const UTILITY: &str = include_str!("../test_scripts/common_scripts/utility.gsc");

fn includes(name: &str) -> Result<Vec<u8>, CompileError> {
    match name {
        "common_scripts\\utility" => Ok(UTILITY.as_bytes().to_vec()),
        _ => Err(CompileError::MissingInclude {
            name: name.to_string(),
            path: format!("{name}.gsc"),
        }),
    }
}

fn parse_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/parse");
    for (label, source) in [("hello", HELLO), ("gametype", GAMETYPE)] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(label, |b| {
            b.iter(|| {
                let arena = Bump::new();
                let script = Parser::parse(black_box(source), &arena).unwrap();
                black_box(script.functions.len())
            });
        });
    }
    group.finish();
}

fn compile_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/compile");
    group.throughput(Throughput::Bytes(GAMETYPE.len() as u64));

    for mode in [BuildMode::Prod, BuildMode::Dev] {
        let compiler = ScriptCompiler::new(mode);
        group.bench_function(format!("gametype_{mode:?}").to_lowercase(), |b| {
            b.iter(|| {
                let assembly = compiler
                    .compile_source(black_box(GAMETYPE.as_bytes()), &mut includes)
                    .unwrap();
                black_box(assembly.instruction_count())
            });
        });
    }
    group.finish();
}

fn assemble_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/compile_and_assemble");
    group.throughput(Throughput::Bytes(GAMETYPE.len() as u64));

    for level in [1, 6, 9] {
        let pipeline = Pipeline::reference(BuildMode::Prod, Arc::default(), level);
        group.bench_function(format!("zlib_{level}"), |b| {
            b.iter(|| {
                let script = pipeline
                    .compile_and_assemble("scripts/gametype", black_box(GAMETYPE.as_bytes()), &mut includes)
                    .unwrap();
                black_box(script.compressed_len())
            });
        });
    }
    group.finish();
}

struct NoAssets;

impl AssetDatabase for NoAssets {
    type Asset = ();

    fn find_asset(&self, _ty: AssetType, _name: &str, _allow_create_default: bool) -> Option<()> {
        None
    }

    fn is_default(&self, _ty: AssetType, _name: &str) -> bool {
        true
    }
}

struct StaticFiles(HashMap<&'static str, &'static str>);

impl FileAccess for StaticFiles {
    fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        self.0.get(path).map(|s| s.as_bytes().to_vec())
    }

    fn list_files(&self, _dir: &str, _extension: &str, _depth: usize) -> Vec<String> {
        Vec::new()
    }
}

fn lookup_benchmarks(c: &mut Criterion) {
    let files = StaticFiles(HashMap::from([
        ("scripts/gametype.gsc", GAMETYPE),
        ("common_scripts\\utility.gsc", UTILITY),
    ]));
    let loader = ScriptLoader::new(NoAssets, files);
    loader.load_script("scripts/gametype").unwrap();

    let mut group = c.benchmark_group("pipeline/lookup");
    group.bench_function("cache_hit", |b| {
        b.iter(|| black_box(loader.find_script(AssetType::ScriptFile, black_box("scripts/gametype"), false)));
    });
    group.bench_function("host_fallback", |b| {
        b.iter(|| black_box(loader.find_script(AssetType::ScriptFile, black_box("scripts/none"), false)));
    });
    group.finish();
}

criterion_group!(
    benches,
    parse_benchmarks,
    compile_benchmarks,
    assemble_benchmarks,
    lookup_benchmarks
);
criterion_main!(benches);
