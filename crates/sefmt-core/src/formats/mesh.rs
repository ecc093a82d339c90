//! Bone mesh (`.bm`).
//!
//! The header version picks one of two LOD layouts for the whole file:
//!
//! - versions 11 and 12 store a compact LOD (source file, distance, flags and
//!   padded vertices). With [`DecoderConfig::legacy_mesh_groups`] the normals,
//!   UV maps, surfaces, weight maps and morph maps that follow are decoded too;
//!   legacy surfaces index triangles with `u32`.
//! - version 16 stores per-LOD counts up front, followed by every attribute
//!   group; triangles are indexed with `u16`.
//!
//! Any other version fails with `UnsupportedVersion`.

use crate::config::DecoderConfig;
use crate::error::{DecodeError, DecodeResult, ResultExt};
use crate::stream::{
    counted, expect_magic, read_ctstring, read_flags, read_float3, ByteCursor, DecodeContext,
    CTSTRING_MIN, FLOAT3_SIZE,
};
use crate::value::{FlagSchema, Record, Value};

/// Bit names of a mesh LOD flags word
pub const LOD_FLAGS: FlagSchema = &[
    ("halfFaceForward", 0),
    ("fullFaceForward", 1),
    ("useVertexProgram", 2),
    ("surfaceRelativeVertices", 3),
    ("normalizedWeights", 4),
];

const LOD_MIN: usize = 6 * 4 + CTSTRING_MIN + 8;
const LEGACY_LOD_MIN: usize = CTSTRING_MIN + 12;
const PADDED_VERTEX_SIZE: usize = 16;
const UV_SIZE: usize = 8;
const SURFACE_MIN: usize = CTSTRING_MIN + 6 * 4;
const LEGACY_SURFACE_MIN: usize = CTSTRING_MIN + 3 * 4;
const WEIGHT_MAP_MIN: usize = CTSTRING_MIN + 4;
const MORPH_MAP_MIN: usize = CTSTRING_MIN + 8;
const MORPH_SET_SIZE: usize = 4 + 2 * FLOAT3_SIZE;
const LEGACY_MORPH_SET_SIZE: usize = 4 + 6 * 4 + 4;
const WEIGHT_INFO_SIZE: usize = 8;

/// LOD layout, fixed for a whole file by the header version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LodLayout {
    Legacy,
    Current,
}

impl LodLayout {
    fn for_version(version: u32, offset: usize) -> DecodeResult<Self> {
        match version {
            11 | 12 => Ok(LodLayout::Legacy),
            16 => Ok(LodLayout::Current),
            other => Err(DecodeError::unsupported_version(other, offset)),
        }
    }

    fn min_size(self) -> usize {
        match self {
            LodLayout::Legacy => LEGACY_LOD_MIN,
            LodLayout::Current => LOD_MIN,
        }
    }
}

pub(super) fn decode(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut header = Record::new();
    header.insert("magic", expect_magic(cur, "MESH").at("magic").at("header")?);
    let version_offset = cur.position();
    let version = cur.read_u32().at("version").at("header")?;
    header.insert("version", version);
    if version > 12 {
        header.insert("size", cur.read_u32().at("size").at("header")?);
    }
    let lod_count = cur.read_u32().at("lodCount").at("header")?;
    header.insert("lodCount", lod_count);

    let layout = LodLayout::for_version(version, version_offset)
        .at("version")
        .at("header")?;

    let mut mesh = Record::new().with("header", header);
    let ctx = DecodeContext::root(&mesh, config);
    let lods = counted(cur, config, lod_count, layout.min_size(), |cur| match layout {
        LodLayout::Legacy => legacy_lod(cur, ctx),
        LodLayout::Current => lod(cur, ctx),
    })
    .at("lods")?;
    mesh.insert("lods", lods);
    Ok(mesh)
}

fn lod(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let config = ctx.config();
    let mut lod = Record::new();

    let vtx_count = cur.read_u32().at("vtxCount")?;
    let uv_count = cur.read_u32().at("uvCount")?;
    let surface_count = cur.read_u32().at("surfaceCount")?;
    let weight_count = cur.read_u32().at("weightCount")?;
    let morph_count = cur.read_u32().at("morphCount")?;
    let weight_info_count = cur.read_u32().at("weightInfoCount")?;
    lod.insert("vtxCount", vtx_count);
    lod.insert("uvCount", uv_count);
    lod.insert("surfaceCount", surface_count);
    lod.insert("weightCount", weight_count);
    lod.insert("morphCount", morph_count);
    lod.insert("weightInfoCount", weight_info_count);

    lod.insert("sourceFile", read_ctstring(cur).at("sourceFile")?);
    lod.insert("maxDistance", cur.read_f32().at("maxDistance")?);
    lod.insert("flags", read_flags(cur, LOD_FLAGS).at("flags")?);

    let vertices = counted(cur, config, vtx_count, FLOAT3_SIZE, read_float3).at("vertices")?;
    lod.insert("vertices", vertices);
    let normals = counted(cur, config, vtx_count, FLOAT3_SIZE, read_float3).at("normals")?;
    lod.insert("normals", normals);

    let uv_maps = counted(cur, config, uv_count, CTSTRING_MIN, |cur| {
        uv_map(cur, ctx.child(&lod))
    })
    .at("uvMaps")?;
    lod.insert("uvMaps", uv_maps);

    let surfaces = counted(cur, config, surface_count, SURFACE_MIN, |cur| {
        surface(cur, config)
    })
    .at("surfaces")?;
    lod.insert("surfaces", surfaces);

    let weight_maps = counted(cur, config, weight_count, WEIGHT_MAP_MIN, |cur| {
        weight_map(cur, config)
    })
    .at("weightMaps")?;
    lod.insert("weightMaps", weight_maps);

    let morph_maps = counted(cur, config, morph_count, MORPH_MAP_MIN, |cur| {
        morph_map(cur, config)
    })
    .at("morphMaps")?;
    lod.insert("morphMaps", morph_maps);

    let infos = counted(cur, config, weight_info_count, WEIGHT_INFO_SIZE, weight_map_info)
        .at("weightMapInfos")?;
    lod.insert("weightMapInfos", infos);

    Ok(lod)
}

fn legacy_lod(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let config = ctx.config();
    let mut lod = Record::new();
    lod.insert("sourceFile", read_ctstring(cur).at("sourceFile")?);
    lod.insert("maxDistance", cur.read_f32().at("maxDistance")?);
    lod.insert("flags", read_flags(cur, LOD_FLAGS).at("flags")?);

    let vtx_count = cur.read_u32().at("vtxCount")?;
    lod.insert("vtxCount", vtx_count);
    let vertices = counted(cur, config, vtx_count, PADDED_VERTEX_SIZE, padded_vertex).at("vertices")?;
    lod.insert("vertices", vertices);

    if !config.legacy_mesh_groups {
        return Ok(lod);
    }

    let normals = counted(cur, config, vtx_count, PADDED_VERTEX_SIZE, padded_vertex).at("normals")?;
    lod.insert("normals", normals);

    let uv_count = cur.read_u32().at("uvCount")?;
    lod.insert("uvCount", uv_count);
    let uv_maps = counted(cur, config, uv_count, CTSTRING_MIN, |cur| {
        uv_map(cur, ctx.child(&lod))
    })
    .at("uvMaps")?;
    lod.insert("uvMaps", uv_maps);

    let surface_count = cur.read_u32().at("surfaceCount")?;
    lod.insert("surfaceCount", surface_count);
    let surfaces = counted(cur, config, surface_count, LEGACY_SURFACE_MIN, |cur| {
        legacy_surface(cur, config)
    })
    .at("surfaces")?;
    lod.insert("surfaces", surfaces);

    let weight_count = cur.read_u32().at("weightCount")?;
    lod.insert("weightCount", weight_count);
    let weight_maps = counted(cur, config, weight_count, WEIGHT_MAP_MIN, |cur| {
        weight_map(cur, config)
    })
    .at("weightMaps")?;
    lod.insert("weightMaps", weight_maps);

    let morph_count = cur.read_u32().at("morphCount")?;
    lod.insert("morphCount", morph_count);
    let morph_maps = counted(cur, config, morph_count, MORPH_MAP_MIN, |cur| {
        legacy_morph_map(cur, config)
    })
    .at("morphMaps")?;
    lod.insert("morphMaps", morph_maps);

    Ok(lod)
}

fn padded_vertex(cur: &mut ByteCursor) -> DecodeResult<Record> {
    Ok(Record::new()
        .with("x", cur.read_f32().at("x")?)
        .with("y", cur.read_f32().at("y")?)
        .with("z", cur.read_f32().at("z")?)
        .with("dummy", cur.read_u32().at("dummy")?))
}

/// One UV set; its length is the vertex count of the enclosing LOD
fn uv_map(cur: &mut ByteCursor, ctx: DecodeContext<'_>) -> DecodeResult<Record> {
    let id = read_ctstring(cur).at("id")?;
    let count = ctx.parent_u32("vtxCount", cur).at("uvCoords")?;
    let coords = counted(cur, ctx.config(), count, UV_SIZE, |cur| {
        Ok(Record::new()
            .with("u", cur.read_f32().at("u")?)
            .with("v", cur.read_f32().at("v")?))
    })
    .at("uvCoords")?;
    Ok(Record::new().with("id", id).with("uvCoords", coords))
}

fn surface(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut surface = Record::new();
    surface.insert("id", read_ctstring(cur).at("id")?);
    surface.insert("flags", cur.read_u32().at("flags")?);
    surface.insert("firstVtx", cur.read_u32().at("firstVtx")?);
    surface.insert("vtxCount", cur.read_u32().at("vtxCount")?);

    let tri_count = cur.read_u32().at("triCount")?;
    surface.insert("triCount", tri_count);
    let triangles = counted(cur, config, tri_count, 6, |cur| {
        let indices = [cur.read_u16()?, cur.read_u16()?, cur.read_u16()?];
        Ok(triangle(indices.map(Value::from)))
    })
    .at("triangles")?;
    surface.insert("triangles", triangles);

    let wmi_count = cur.read_u32().at("relativeWmiCount")?;
    surface.insert("relativeWmiCount", wmi_count);
    let wmi = counted(cur, config, wmi_count, 1, ByteCursor::read_u8).at("relativeWmi")?;
    surface.insert("relativeWmi", wmi);

    let shader_exists = cur.read_u32().at("shaderExists")?;
    surface.insert("shaderExists", shader_exists);
    if shader_exists > 0 {
        surface.insert("shaderParams", shader_params(cur, config).at("shaderParams")?);
    }
    Ok(surface)
}

fn legacy_surface(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut surface = Record::new();
    surface.insert("id", read_ctstring(cur).at("id")?);
    surface.insert("firstVtx", cur.read_u32().at("firstVtx")?);
    surface.insert("vtxCount", cur.read_u32().at("vtxCount")?);

    let tri_count = cur.read_u32().at("triCount")?;
    surface.insert("triCount", tri_count);
    let triangles = counted(cur, config, tri_count, 12, |cur| {
        let indices = [cur.read_u32()?, cur.read_u32()?, cur.read_u32()?];
        Ok(triangle(indices.map(Value::from)))
    })
    .at("triangles")?;
    surface.insert("triangles", triangles);
    Ok(surface)
}

fn triangle(indices: [Value; 3]) -> Record {
    Record::new().with("vertices", Vec::from(indices))
}

fn shader_params(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let mut params = Record::new();
    let tex_count = cur.read_u32().at("texCount")?;
    let uv_count = cur.read_u32().at("uvCount")?;
    let color_count = cur.read_u32().at("colorCount")?;
    let float_count = cur.read_u32().at("floatCount")?;
    params.insert("texCount", tex_count);
    params.insert("uvCount", uv_count);
    params.insert("colorCount", color_count);
    params.insert("floatCount", float_count);
    params.insert("shaderName", read_ctstring(cur).at("shaderName")?);

    let textures = counted(cur, config, tex_count, CTSTRING_MIN, read_ctstring).at("textures")?;
    params.insert("textures", textures);
    let uv_maps = counted(cur, config, uv_count, 4, ByteCursor::read_u32).at("uvMaps")?;
    params.insert("uvMaps", uv_maps);
    let colors = counted(cur, config, color_count, 4, ByteCursor::read_u32).at("colors")?;
    params.insert("colors", colors);
    let floats = counted(cur, config, float_count, 4, ByteCursor::read_f32).at("floatParams")?;
    params.insert("floatParams", floats);
    Ok(params)
}

fn weight_map(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let id = read_ctstring(cur).at("id")?;
    let vtx_count = cur.read_u32().at("vtxCount")?;
    let vertices = counted(cur, config, vtx_count, 8, |cur| {
        Ok(Record::new()
            .with("vtx", cur.read_u32().at("vtx")?)
            .with("weight", cur.read_f32().at("weight")?))
    })
    .at("vertices")?;
    Ok(Record::new()
        .with("id", id)
        .with("vtxCount", vtx_count)
        .with("vertices", vertices))
}

fn morph_map(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let id = read_ctstring(cur).at("id")?;
    let is_relative = cur.read_u32().at("isRelative")?;
    let set_count = cur.read_u32().at("setCount")?;
    let sets = counted(cur, config, set_count, MORPH_SET_SIZE, |cur| {
        Ok(Record::new()
            .with("vtx", cur.read_u32().at("vtx")?)
            .with("pos", read_float3(cur).at("pos")?)
            .with("normal", read_float3(cur).at("normal")?))
    })
    .at("sets")?;
    Ok(Record::new()
        .with("id", id)
        .with("isRelative", is_relative)
        .with("setCount", set_count)
        .with("sets", sets))
}

fn legacy_morph_map(cur: &mut ByteCursor, config: &DecoderConfig) -> DecodeResult<Record> {
    let id = read_ctstring(cur).at("id")?;
    let is_relative = cur.read_u32().at("isRelative")?;
    let set_count = cur.read_u32().at("setCount")?;
    let sets = counted(cur, config, set_count, LEGACY_MORPH_SET_SIZE, |cur| {
        let mut set = Record::new().with("vtx", cur.read_u32().at("vtx")?);
        for name in ["x", "y", "z", "nx", "ny", "nz"] {
            set.insert(name, cur.read_f32().at(name)?);
        }
        set.insert("dummy", cur.read_u32().at("dummy")?);
        Ok(set)
    })
    .at("sets")?;
    Ok(Record::new()
        .with("id", id)
        .with("isRelative", is_relative)
        .with("setCount", set_count)
        .with("sets", sets))
}

fn weight_map_info(cur: &mut ByteCursor) -> DecodeResult<Record> {
    let indices: [u8; 4] = cur.read_array().at("indices")?;
    let weights: [u8; 4] = cur.read_array().at("weights")?;
    Ok(Record::new()
        .with("indices", Vec::from(indices.map(Value::from)))
        .with("weights", Vec::from(weights.map(Value::from))))
}
