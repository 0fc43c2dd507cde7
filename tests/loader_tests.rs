mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{CountingCompiler, FakeAssetDatabase, HostAsset, MemoryFiles, init_logging};
use gsc_loader::{
    AssetType, CompiledScript, Diagnostics, LoaderConfig, ScriptAsset, ScriptLoader, Stage,
    StackAssembler, StackReader, TokenTable,
};
use parking_lot::Mutex;
use tempdir::TempDir;

type Loader = ScriptLoader<FakeAssetDatabase, MemoryFiles>;

struct Harness {
    loader: Loader,
    diagnostics: Arc<Mutex<Diagnostics>>,
    compiles: Arc<AtomicUsize>,
}

impl Harness {
    fn new(database: FakeAssetDatabase, files: MemoryFiles) -> Self {
        Self::with_config(database, files, LoaderConfig::default(), Arc::default())
    }

    fn with_config(
        database: FakeAssetDatabase,
        files: MemoryFiles,
        config: LoaderConfig,
        tokens: Arc<TokenTable>,
    ) -> Self {
        init_logging();
        let diagnostics = Arc::new(Mutex::new(Diagnostics::new()));
        let (compiler, compiles) = CountingCompiler::new();
        let loader = ScriptLoader::builder(database, files)
            .config(config)
            .tokens(Arc::clone(&tokens))
            .sink(diagnostics.clone())
            .toolchain(Box::new(compiler), Box::new(StackAssembler::with_tokens(tokens)))
            .build();
        Self {
            loader,
            diagnostics,
            compiles,
        }
    }

    fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    fn lookup(&self, name: &str) -> Option<ScriptAsset<HostAsset>> {
        self.loader.find_script(AssetType::ScriptFile, name, false)
    }

    fn compiled(&self, name: &str) -> Arc<CompiledScript> {
        match self.lookup(name) {
            Some(ScriptAsset::Compiled(script)) => script,
            other => panic!("expected a compiled script for {name}, got {other:?}"),
        }
    }
}

#[test]
fn custom_source_overrides_the_database() {
    let harness = Harness::new(
        FakeAssetDatabase::new().with_asset(AssetType::ScriptFile, "scripts/foo", false),
        MemoryFiles::new().with_file("scripts/foo.gsc", "main() { }"),
    );

    let script = harness.compiled("scripts/foo");
    assert_eq!(script.name(), "scripts/foo");
    assert!(script.bytecode_len() > 0);
    assert_eq!(harness.loader.database().find_calls(), 0);
    assert!(harness.diagnostics.lock().is_empty());
}

#[test]
fn repeated_lookups_return_the_same_object() {
    let harness = Harness::new(
        FakeAssetDatabase::new(),
        MemoryFiles::new().with_file("scripts/foo.gsc", "main() { }"),
    );

    let first = harness.compiled("scripts/foo");
    harness
        .loader
        .files()
        .set("scripts/foo.gsc", "main() { level.changed = 1; }");
    let second = harness.compiled("scripts/foo");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(harness.compiles(), 1);
}

#[test]
fn without_source_the_database_answers() {
    let harness = Harness::new(
        FakeAssetDatabase::new().with_asset(AssetType::ScriptFile, "maps/mp/_load", false),
        MemoryFiles::new(),
    );

    let found = harness.lookup("maps/mp/_load");
    assert_eq!(
        found.as_ref().and_then(ScriptAsset::as_host),
        Some(&HostAsset {
            ty: AssetType::ScriptFile,
            name: "maps/mp/_load".into()
        })
    );
    assert!(!harness.loader.is_default(AssetType::ScriptFile, "maps/mp/_load"));

    assert!(harness.lookup("maps/mp/_missing").is_none());
    assert!(harness.loader.is_default(AssetType::ScriptFile, "maps/mp/_missing"));

    assert_eq!(harness.loader.database().find_calls(), 2);
    assert_eq!(harness.compiles(), 0);
}

#[test]
fn cached_scripts_are_never_default() {
    let harness = Harness::new(
        FakeAssetDatabase::new(),
        MemoryFiles::new().with_file("scripts/foo.gsc", "main() { }"),
    );

    assert!(harness.loader.is_default(AssetType::ScriptFile, "scripts/foo"));
    harness.compiled("scripts/foo");
    assert!(!harness.loader.is_default(AssetType::ScriptFile, "scripts/foo"));
    assert!(harness.loader.is_default(AssetType::RawFile, "scripts/foo"));
}

#[test]
fn other_asset_types_pass_through() {
    let harness = Harness::new(
        FakeAssetDatabase::new().with_asset(AssetType::RawFile, "scripts/foo", false),
        MemoryFiles::new().with_file("scripts/foo.gsc", "main() { }"),
    );

    let asset = harness
        .loader
        .find_script(AssetType::RawFile, "scripts/foo", false)
        .unwrap();
    assert!(!asset.is_compiled());
    assert!(
        harness
            .loader
            .find_script(AssetType::Other(31), "scripts/foo", true)
            .is_none()
    );
    assert_eq!(harness.loader.files().reads(), 0);
    assert!(harness.loader.cache().is_empty());
}

#[test]
fn missing_include_falls_back_to_the_host() {
    let harness = Harness::new(
        FakeAssetDatabase::new().with_asset(AssetType::ScriptFile, "scripts/foo", false),
        MemoryFiles::new().with_file("scripts/foo.gsc", "#include missing_module;\nmain() { }"),
    );

    let asset = harness.lookup("scripts/foo").unwrap();
    assert!(!asset.is_compiled());
    assert!(!harness.loader.cache().contains("scripts/foo"));

    let diagnostics = harness.diagnostics.lock();
    let reported: Vec<_> = diagnostics.for_script("scripts/foo").collect();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].stage, Stage::Compile);
    assert_eq!(reported[0].message, "Could not load gsc file 'missing_module.gsc'");
}

#[test]
fn deeply_nested_source_falls_back_to_the_host() {
    let parens = 5000;
    let blocks = 5000;
    let source = format!(
        "main() {{ x = {}1{}; }}\ninit() {{ {} }}",
        "(".repeat(parens),
        ")".repeat(parens),
        "while (x) {".repeat(blocks)
    );
    let harness = Harness::new(
        FakeAssetDatabase::new().with_asset(AssetType::ScriptFile, "scripts/deep", false),
        MemoryFiles::new().with_file("scripts/deep.gsc", &source),
    );

    let asset = harness.lookup("scripts/deep").unwrap();
    assert!(!asset.is_compiled());
    assert!(!harness.loader.cache().contains("scripts/deep"));

    let diagnostics = harness.diagnostics.lock();
    let reported: Vec<_> = diagnostics.for_script("scripts/deep").collect();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].stage, Stage::Compile);
    assert!(reported[0].message.contains("nesting"));
}

#[test]
fn non_utf8_source_falls_back_to_the_host() {
    let harness = Harness::new(
        FakeAssetDatabase::new().with_asset(AssetType::ScriptFile, "scripts/latin1", false),
        MemoryFiles::new(),
    );
    harness
        .loader
        .files()
        .set_bytes("scripts/latin1.gsc", b"main() { level.name = \"caf\xe9\"; }".as_slice());

    assert!(!harness.lookup("scripts/latin1").unwrap().is_compiled());
    let diagnostics = harness.diagnostics.lock();
    let reported: Vec<_> = diagnostics.for_script("scripts/latin1").collect();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].message.contains("invalid UTF-8"));
}

#[test]
fn failures_are_not_cached() {
    let harness = Harness::new(
        FakeAssetDatabase::new(),
        MemoryFiles::new().with_file("scripts/foo.gsc", "main() { x = y; }"),
    );

    assert!(harness.lookup("scripts/foo").is_none());
    assert!(harness.lookup("scripts/foo").is_none());
    assert_eq!(harness.compiles(), 2);
    assert_eq!(harness.diagnostics.lock().count_at(Stage::Compile), 2);

    harness.loader.files().set("scripts/foo.gsc", "main() { y = 1; x = y; }");
    harness.compiled("scripts/foo");
    assert_eq!(harness.compiles(), 3);
}

#[test]
fn includes_resolve_through_file_access() {
    let harness = Harness::new(
        FakeAssetDatabase::new(),
        MemoryFiles::new()
            .with_file("scripts/foo.gsc", "#include common\\util;\nmain() { helper(); }")
            .with_file("common\\util.gsc", "helper() { level.ready = true; }"),
    );

    let script = harness.compiled("scripts/foo");
    let stack = StackReader::parse(&script.decompress_stack().unwrap()).unwrap();
    assert!(stack.find("main", None).is_some());
    assert!(stack.find("helper", None).is_none());
}

#[test]
fn empty_source_falls_back_to_the_database() {
    let harness = Harness::new(
        FakeAssetDatabase::new().with_asset(AssetType::ScriptFile, "scripts/empty", false),
        MemoryFiles::new().with_file("scripts/empty.gsc", ""),
    );

    match harness.lookup("scripts/empty") {
        Some(ScriptAsset::Host(asset)) => assert_eq!(asset.name, "scripts/empty"),
        other => panic!("expected the host asset, got {other:?}"),
    }
    assert_eq!(harness.compiles(), 0);
    assert_eq!(harness.loader.database().find_calls(), 1);
    assert!(!harness.loader.cache().contains("scripts/empty"));
    assert!(harness.diagnostics.lock().is_empty());
    assert!(matches!(
        harness.loader.load_script("scripts/empty"),
        Err(gsc_loader::LoaderError::SourceUnavailable(_))
    ));
}

#[test]
fn shutdown_clears_everything() {
    let harness = Harness::new(
        FakeAssetDatabase::new(),
        MemoryFiles::new()
            .with_file("scripts/a.gsc", "main() { }")
            .with_file("scripts/b.gsc", "init() { }"),
    );

    let a = harness.compiled("scripts/a");
    harness.compiled("scripts/b");
    assert!(harness.loader.cache().allocated_bytes() > 0);

    harness.loader.on_shutdown(false);
    assert_eq!(harness.loader.cache().len(), 2);

    harness.loader.on_shutdown(true);
    assert!(harness.loader.cache().get("scripts/a").is_none());
    assert!(harness.loader.cache().get("scripts/b").is_none());
    assert_eq!(harness.loader.cache().allocated_bytes(), 0);

    let again = harness.compiled("scripts/a");
    assert!(!Arc::ptr_eq(&a, &again));
    assert_eq!(harness.compiles(), 3);
}

#[test]
fn numeric_alias_shares_the_cache_entry() {
    let tokens = Arc::new(TokenTable::from_entries([(1337u16, "scripts/foo")]).unwrap());
    let harness = Harness::with_config(
        FakeAssetDatabase::new(),
        MemoryFiles::new().with_file("scripts/foo.gsc", "main() { }"),
        LoaderConfig::default(),
        tokens,
    );

    let identity = harness.loader.resolver().resolve("1337");
    assert_eq!(identity.name, "scripts/foo");
    assert_eq!(harness.loader.resolver().resolve("scripts/foo").token, identity.token);

    let by_token = harness.compiled("1337");
    let by_name = harness.compiled("scripts/foo");
    assert!(Arc::ptr_eq(&by_token, &by_name));
    assert_eq!(harness.compiles(), 1);
    assert!(!harness.loader.is_default(AssetType::ScriptFile, "1337"));
}

#[test]
fn decompressed_stack_matches_the_assembler() {
    let source = "main() { level.name = \"foo\"; wait 0.05; }\ninit() { thread main(); }";
    let harness = Harness::new(
        FakeAssetDatabase::new(),
        MemoryFiles::new().with_file("scripts/foo.gsc", source),
    );
    let script = harness.compiled("scripts/foo");

    let assembly = gsc_loader::ScriptCompiler::default()
        .compile_source(source.as_bytes(), &mut gsc_compiler::NoIncludes)
        .unwrap();
    let expected = StackAssembler::new().assemble_script(&assembly).unwrap();

    assert_eq!(script.decompress_stack().unwrap(), expected.stack);
    assert_eq!(script.bytecode(), expected.bytecode.as_slice());
}

#[test]
fn dump_writes_gscbin() {
    let dump = TempDir::new("gsc-dump").unwrap();
    let harness = Harness::with_config(
        FakeAssetDatabase::new(),
        MemoryFiles::new().with_file("scripts/mp/foo.gsc", "main() { }"),
        LoaderConfig::default().with_dump_dir(dump.path()),
        Arc::default(),
    );

    let script = harness.compiled("scripts/mp/foo");
    let bin = std::fs::read(dump.path().join("scripts/mp/foo.gscbin")).unwrap();
    assert_eq!(bin, script.to_gscbin());

    let back = CompiledScript::from_gscbin(&bin).unwrap();
    assert_eq!(back.name(), "scripts/mp/foo");
    assert_eq!(back.decompress_stack().unwrap(), script.decompress_stack().unwrap());
}

#[test]
fn dump_covers_host_served_scripts() {
    let dump = TempDir::new("gsc-dump").unwrap();
    let harness = Harness::with_config(
        FakeAssetDatabase::new()
            .with_asset(AssetType::ScriptFile, "maps/mp/_load", false)
            .with_asset(AssetType::RawFile, "maps/mp/_load", false)
            .with_script_images(),
        MemoryFiles::new(),
        LoaderConfig::default().with_dump_dir(dump.path()),
        Arc::default(),
    );

    assert!(!harness.lookup("maps/mp/_load").unwrap().is_compiled());
    let bin = std::fs::read(dump.path().join("maps/mp/_load.gscbin")).unwrap();
    let back = CompiledScript::from_gscbin(&bin).unwrap();
    assert_eq!(back.name(), "maps/mp/_load");
    assert_eq!(back.decompress_stack().unwrap(), b"packaged maps/mp/_load");
    std::fs::remove_file(dump.path().join("maps/mp/_load.gscbin")).unwrap();

    harness.loader.find_script(AssetType::RawFile, "maps/mp/_load", false).unwrap();
    assert!(!dump.path().join("maps/mp/_load.gscbin").exists());
    assert!(harness.diagnostics.lock().is_empty());
}

#[test]
fn host_scripts_are_not_dumped_without_a_dump_dir() {
    let harness = Harness::new(
        FakeAssetDatabase::new()
            .with_asset(AssetType::ScriptFile, "maps/mp/_load", false)
            .with_script_images(),
        MemoryFiles::new(),
    );
    assert!(harness.lookup("maps/mp/_load").is_some());
    assert!(harness.diagnostics.lock().is_empty());
}

#[test]
fn dump_failure_is_not_fatal() {
    let dump = TempDir::new("gsc-dump").unwrap();
    let blocker = dump.path().join("blocked");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let harness = Harness::with_config(
        FakeAssetDatabase::new(),
        MemoryFiles::new().with_file("scripts/foo.gsc", "main() { }"),
        LoaderConfig::default().with_dump_dir(&blocker),
        Arc::default(),
    );

    harness.compiled("scripts/foo");
    assert_eq!(harness.diagnostics.lock().count_at(Stage::Dump), 1);
}

#[test]
fn slow_lookups_still_return_the_asset() {
    let harness = Harness::with_config(
        FakeAssetDatabase::new()
            .with_asset(AssetType::ScriptFile, "maps/mp/_load", false)
            .with_delay(Duration::from_millis(5)),
        MemoryFiles::new(),
        LoaderConfig::default().with_slow_lookup_threshold(Duration::ZERO),
        Arc::default(),
    );

    assert!(harness.lookup("maps/mp/_load").is_some());
    assert!(harness.lookup("maps/mp/_missing").is_none());
}

#[test]
fn concurrent_lookups_agree() {
    let harness = Harness::new(
        FakeAssetDatabase::new(),
        MemoryFiles::new().with_file("scripts/foo.gsc", "main() { level.x = 1; }"),
    );

    let scripts: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| harness.compiled("scripts/foo")))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let cached = harness.loader.cache().get("scripts/foo").unwrap();
    assert!(scripts.iter().all(|s| Arc::ptr_eq(s, &cached)));
    assert_eq!(harness.loader.cache().len(), 1);
}

#[test]
fn bundled_test_scripts_compile() {
    let harness = Harness::new(
        FakeAssetDatabase::new(),
        MemoryFiles::new()
            .with_file("scripts/hello.gsc", include_str!("../test_scripts/hello.gsc"))
            .with_file("scripts/gametype.gsc", include_str!("../test_scripts/gametype.gsc"))
            .with_file(
                "common_scripts\\utility.gsc",
                include_str!("../test_scripts/common_scripts/utility.gsc"),
            ),
    );

    harness.compiled("scripts/hello");
    let gametype = harness.compiled("scripts/gametype");
    let stack = StackReader::parse(&gametype.decompress_stack().unwrap()).unwrap();
    for entry in ["init", "main", "on_player_spawned", "score_for_kill"] {
        assert!(stack.find(entry, None).is_some(), "missing export {entry}");
    }
    assert!(stack.strings().iter().any(|s| s == "MP_KILLSTREAK"));
    assert!(harness.diagnostics.lock().is_empty());
}
