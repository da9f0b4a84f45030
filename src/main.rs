use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info};
use uuid::Uuid;

use stickerlab::cli::{Args, Command};
use stickerlab::entities::compositor;
use stickerlab::export::{export_pack, DirSink};
use stickerlab::store::{JsonStore, Store};

fn main() -> Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let default_level = match args.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Console logging with specified verbosity level (respects RUST_LOG if set)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();

    info!("Stickerlab starting...");
    debug!("Command-line args: {:?}", args);

    let mut store = JsonStore::open(&args.store)
        .with_context(|| format!("opening store {}", args.store.display()))?;

    match args.command {
        Command::Render { sticker, out } => render_cmd(&store, sticker, out),
        Command::Export { pack, out } => export_cmd(&store, pack, out),
        Command::Clean => clean_cmd(&mut store),
    }
}

/// Render one sticker and write the PNG to `out` (default `<id>.png`).
fn render_cmd(store: &JsonStore, sticker_id: Uuid, out: Option<PathBuf>) -> Result<()> {
    let sticker = store.require_sticker(sticker_id)?;
    let png = compositor::render_sticker_png(&sticker)?;
    let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.png", sticker_id)));
    fs::write(&out, png).with_context(|| format!("writing {}", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

/// Export a pack bundle into `<out>/<pack file stem>/`.
fn export_cmd(store: &JsonStore, pack_id: Option<Uuid>, out: PathBuf) -> Result<()> {
    let pack_id = match pack_id {
        Some(id) => id,
        None => only_pack(store)?,
    };
    let pack = store.require_pack(pack_id)?;
    let root = out.join(pack.file_stem());
    let mut sink = DirSink::new(&root);
    let meta = export_pack(store, pack_id, &mut sink)?;
    println!("{} ({} stickers)", root.display(), meta.stickers.len());
    Ok(())
}

fn only_pack(store: &JsonStore) -> Result<Uuid> {
    let packs = store.list_packs()?;
    match packs.as_slice() {
        [] => bail!("store has no packs"),
        [pack] => Ok(pack.id),
        _ => bail!("store has {} packs, pass a pack id", packs.len()),
    }
}

/// Drop sticker records that no pack references.
fn clean_cmd(store: &mut JsonStore) -> Result<()> {
    let referenced: HashSet<Uuid> = store
        .list_packs()?
        .iter()
        .flat_map(|pack| pack.sticker_ids.iter().copied())
        .collect();

    let mut removed = 0usize;
    for sticker in store.list_stickers()? {
        if !referenced.contains(&sticker.id) {
            debug!("Dropping orphaned sticker {}", sticker.id);
            store.delete_sticker(sticker.id)?;
            removed += 1;
        }
    }
    println!("{} orphaned sticker(s) removed", removed);
    Ok(())
}
