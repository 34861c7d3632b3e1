use std::env;
use std::fs;
use std::path::PathBuf;

use formats::{
    EventDocument, Stats, TimeRangePolicy, decode_point_bytes, encode_points, normalize,
    point_bytes, POINT_STRIDE,
};
use foundation::math::POINT_RADIUS;
use tools::coastline_segments;

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "pack" => cmd_pack(args),
        "coastline" => cmd_coastline(args),
        "restat" => cmd_restat(args),
        "inspect" => cmd_inspect(args),
        _ => Err(usage()),
    }
}

fn cmd_pack(args: Vec<String>) -> Result<(), String> {
    // quakes pack <events.json> <out.bin> <out-stats.json> [--derived-range]
    if args.len() < 3 {
        return Err(usage());
    }

    let input = PathBuf::from(&args[0]);
    let out_bin = PathBuf::from(&args[1]);
    let out_stats = PathBuf::from(&args[2]);

    let mut policy = TimeRangePolicy::historic();
    for arg in &args[3..] {
        match arg.as_str() {
            "--derived-range" => policy = TimeRangePolicy::Derived,
            other => return Err(format!("unknown arg: {other}\n\n{}", usage())),
        }
    }

    let text = fs::read_to_string(&input).map_err(|e| format!("read {input:?}: {e}"))?;
    let doc = EventDocument::from_json_str(&text).map_err(|e| format!("parse events: {e}"))?;

    let normalized = normalize(&doc.events());
    if normalized.dropped > 0 {
        eprintln!("dropped {} invalid records", normalized.dropped);
    }

    let buffer = encode_points(&normalized.events, POINT_RADIUS, policy);
    let bytes = point_bytes(&buffer.data);

    fs::write(&out_bin, &bytes).map_err(|e| format!("write {out_bin:?}: {e}"))?;

    let stats_json = serde_json::to_string_pretty(&buffer.stats).map_err(|e| format!("json: {e}"))?;
    fs::write(&out_stats, stats_json).map_err(|e| format!("write {out_stats:?}: {e}"))?;

    eprintln!(
        "wrote {} ({} points, blake3={})",
        out_bin.display(),
        buffer.stats.total_count,
        blake3::hash(&bytes).to_hex()
    );
    eprintln!("wrote {}", out_stats.display());
    Ok(())
}

fn cmd_coastline(args: Vec<String>) -> Result<(), String> {
    // quakes coastline <coastline.geojson> <out.bin>
    if args.len() != 2 {
        return Err(usage());
    }

    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);

    let text = fs::read_to_string(&input).map_err(|e| format!("read {input:?}: {e}"))?;
    let geojson: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| format!("parse geojson: {e}"))?;

    let vertices = coastline_segments(&geojson)?;

    let mut bytes: Vec<u8> = Vec::with_capacity(vertices.len() * 4);
    for v in &vertices {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(&output, &bytes).map_err(|e| format!("write {output:?}: {e}"))?;

    eprintln!(
        "wrote {} ({} vertices)",
        output.display(),
        vertices.len() / 3
    );
    Ok(())
}

fn cmd_restat(args: Vec<String>) -> Result<(), String> {
    // quakes restat <points.bin> <out-stats.json> [--range <startMs>,<endMs>]
    if args.len() < 2 {
        return Err(usage());
    }

    let input = PathBuf::from(&args[0]);
    let out_stats = PathBuf::from(&args[1]);

    let mut range = (
        formats::HISTORIC_RANGE_START_MS,
        formats::HISTORIC_RANGE_END_MS,
    );

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--range" => {
                i += 1;
                if i >= args.len() {
                    return Err("--range requires <startMs>,<endMs>".to_string());
                }
                range = parse_range(&args[i])?;
            }
            other => return Err(format!("unknown arg: {other}\n\n{}", usage())),
        }
        i += 1;
    }

    let bytes = fs::read(&input).map_err(|e| format!("read {input:?}: {e}"))?;
    let rows = decode_point_bytes(&bytes).map_err(|e| format!("decode: {e}"))?;
    let stats = Stats::from_point_rows(&rows, range).map_err(|e| format!("stats: {e}"))?;

    let stats_json = serde_json::to_string_pretty(&stats).map_err(|e| format!("json: {e}"))?;
    fs::write(&out_stats, stats_json).map_err(|e| format!("write {out_stats:?}: {e}"))?;

    eprintln!("wrote {} ({} points)", out_stats.display(), stats.total_count);
    Ok(())
}

fn cmd_inspect(args: Vec<String>) -> Result<(), String> {
    // quakes inspect <points.bin>
    if args.len() != 1 {
        return Err(usage());
    }

    let input = PathBuf::from(&args[0]);
    let bytes = fs::read(&input).map_err(|e| format!("read {input:?}: {e}"))?;
    let rows = decode_point_bytes(&bytes).map_err(|e| format!("decode: {e}"))?;

    let count = rows.len() / POINT_STRIDE;
    let mut min_mag = f32::INFINITY;
    let mut max_mag = f32::NEG_INFINITY;
    let mut min_depth = f32::INFINITY;
    let mut max_depth = f32::NEG_INFINITY;
    let mut min_t = f32::INFINITY;
    let mut max_t = f32::NEG_INFINITY;

    for row in rows.chunks_exact(POINT_STRIDE) {
        min_mag = min_mag.min(row[3]);
        max_mag = max_mag.max(row[3]);
        if row[4] >= 0.0 {
            min_depth = min_depth.min(row[4]);
            max_depth = max_depth.max(row[4]);
        }
        min_t = min_t.min(row[5]);
        max_t = max_t.max(row[5]);
    }

    println!("{}: {} points ({} bytes)", input.display(), count, bytes.len());
    if count > 0 {
        println!("  magnitude: {min_mag} .. {max_mag}");
        if min_depth.is_finite() {
            println!("  depth:     {min_depth} .. {max_depth} km");
        } else {
            println!("  depth:     unknown for all points");
        }
        println!("  time:      {min_t} .. {max_t} (normalized)");
    }
    Ok(())
}

fn parse_range(raw: &str) -> Result<(f64, f64), String> {
    let mut parts = raw.splitn(2, ',');
    let start = parts
        .next()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or("--range start must be a number")?;
    let end = parts
        .next()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .ok_or("--range end must be a number")?;
    Ok((start, end))
}

fn usage() -> String {
    let exe = env::args().next().unwrap_or_else(|| "quakes".to_string());
    format!(
        "Usage:\n  {exe} pack <events.json> <out.bin> <out-stats.json> [--derived-range]\n  {exe} coastline <coastline.geojson> <out.bin>\n  {exe} restat <points.bin> <out-stats.json> [--range <startMs>,<endMs>]\n  {exe} inspect <points.bin>\n\nNotes:\n- `pack` uses the fixed 1900..2026 time range unless --derived-range is given.\n- `restat` rebuilds the stats artifact from a point binary (recovery after a\n  partial refresh); pass the same range the binary was encoded with.\n- Binaries are raw little-endian f32: stride 6 for points, stride 3 for\n  coastline vertices.\n"
    )
}
