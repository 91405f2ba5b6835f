//! Codec integration tests
//!
//! Decode/encode behaviour through the public API only: the documented
//! scenarios, count handling, type rejection and header classification, plus
//! a property test that any well-formed graph survives a round trip.

use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

use shapeio::codec::{
    self, DecodeError, DecodeOptions, EncodeError, Format, FormatOptions, LineEnding,
    SchemaError, TextEncoding, Variant,
};
use shapeio::domain::*;
use shapeio::storage::{self, SaveOptions};

const SCENARIO: &str = "SIMISA@@@@@@@@@@JINX0s1t______
shape (
  shape_header ( 00000000 00000000 )
  volumes ( 1
    vol_sphere ( vector ( 0 0 0 ) 1.0 )
  )
)
";

// =============================================================================
// Scenario
// =============================================================================

#[test]
fn vol_sphere_scenario() {
    let mut shape = codec::decode(SCENARIO).unwrap();

    assert_eq!(shape.volumes.len(), 1);
    assert_eq!(shape.volumes[0].vector, Vector::new(0.0, 0.0, 0.0));
    assert_eq!(shape.volumes[0].radius, 1.0);

    shape
        .volumes
        .push(VolumeSphere::new(Vector::new(1.5, -2.0, 0.25), 12.0));
    let text = codec::encode(&shape).unwrap();

    assert!(text.contains("volumes ( 2\n"));
    assert_eq!(text.matches("vol_sphere (").count(), 2);
    assert!(text.contains("vector ( 1.5 -2 0.25 ) 12"));

    let again = codec::decode(&text).unwrap();
    assert_eq!(again, shape);
}

// =============================================================================
// Count handling
// =============================================================================

#[test]
fn counts_follow_collection_lengths() {
    let mut shape = codec::decode(SCENARIO).unwrap();
    shape.points.extend([
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
    ]);
    shape.volumes.clear();

    let text = codec::encode(&shape).unwrap();
    assert!(text.contains("\tpoints ( 3\n"));
    assert!(text.contains("\tvolumes ( 0 )\n"));

    shape.points.remove(1);
    let text = codec::encode(&shape).unwrap();
    assert!(text.contains("\tpoints ( 2\n"));
}

#[test]
fn nested_counts_follow_lengths() {
    let mut shape = Shape::default();
    shape.lod_controls.push(LodControl {
        distance_levels_header: DistanceLevelsHeader { dlevel_bias: 1 },
        distance_levels: vec![DistanceLevel {
            distance_level_header: DistanceLevelHeader {
                dlevel_selection: 400,
                hierarchy: vec![-1],
            },
            sub_objects: vec![SubObject::default()],
        }],
    });

    let sub = &mut shape.lod_controls[0].distance_levels[0].sub_objects[0];
    sub.vertices.push(Vertex {
        vertex_uvs: vec![0, 1],
        ..Vertex::default()
    });
    sub.primitives.push(Primitive {
        prim_state_index: 0,
        indexed_trilist: IndexedTrilist {
            vertex_idxs: vec![VertexIdx::new(0, 0, 0)],
            normal_idxs: vec![NormalIdx::new(0, 3)],
            flags: vec![Hex32(0)],
        },
    });

    let text = codec::encode(&shape).unwrap();
    assert!(text.contains("vertex_uvs ( 2 0 1 )"));
    assert!(text.contains("vertex_idxs ( 3 0 0 0 )"));
    assert!(text.contains("normal_idxs ( 1 0 3 )"));
    assert!(text.contains("primitives ( 2\n"));

    assert_eq!(codec::decode(&text).unwrap(), shape);
}

fn points_document(declared: usize, present: usize) -> String {
    let items: String = (0..present)
        .map(|i| format!("\t\tpoint ( {} 0 0 )\n", i))
        .collect();
    format!(
        "SIMISA@@@@@@@@@@JINX0s1t______\n\nshape (\n\tshape_header ( 00000000 00000000 )\n\tpoints ( {}\n{}\t)\n)\n",
        declared, items
    )
}

#[test]
fn count_mismatch_is_rejected() {
    let declared = 3;
    for present in [declared - 1, declared + 1, 0] {
        let err = codec::decode(&points_document(declared, present)).unwrap_err();
        match err {
            DecodeError::Schema(SchemaError::CountMismatch {
                block,
                declared: d,
                found,
                line,
            }) => {
                assert_eq!(block, "points");
                assert_eq!(d, declared);
                assert_eq!(found, present);
                assert_eq!(line, 5);
            }
            other => panic!("expected count mismatch, got {:?}", other),
        }
    }

    assert!(codec::decode(&points_document(declared, declared)).is_ok());
}

#[test]
fn count_mismatch_message_names_both_counts() {
    let err = codec::decode(&points_document(2, 1)).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("points"));
    assert!(message.contains("declared 2"));
    assert!(message.contains("found 1"));
}

// =============================================================================
// Type rejection
// =============================================================================

fn shape_with_foreign_key() -> Shape {
    let mut controller = Controller::new(ControllerKind::LinearPos);
    controller.keys.push(KeyPosition::LinearKey {
        frame: 0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    });
    controller.keys.push(KeyPosition::SlerpRot {
        frame: 1,
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    });

    let mut shape = Shape::default();
    shape.animations = Some(vec![Animation {
        frame_count: 2,
        frame_rate: 30,
        anim_nodes: vec![AnimNode {
            name: "WHEELS11".into(),
            controllers: vec![controller],
        }],
    }]);
    shape
}

#[test]
fn foreign_key_type_is_rejected() {
    let err = codec::encode(&shape_with_foreign_key()).unwrap_err();
    assert_eq!(
        err,
        EncodeError::TypeMismatch {
            collection: "linear_pos".into(),
            index: 1,
            expected: "linear_key",
            found: "slerp_rot".into(),
        }
    );
}

#[test]
fn rejected_encode_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wheels.s");
    let fresh = dir.path().join("fresh.s");
    fs::write(&path, SCENARIO).unwrap();

    assert!(storage::dump(&shape_with_foreign_key(), &path, &SaveOptions::default()).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), SCENARIO);

    assert!(storage::dump(&shape_with_foreign_key(), &fresh, &SaveOptions::default()).is_err());
    assert!(!fresh.exists());
}

#[test]
fn wrong_literal_kind_is_rejected_on_decode() {
    let text = "shape ( shape_header ( 00000000 00000000 ) points ( 1 point ( 1 two 3 ) ) )";
    match codec::decode(text).unwrap_err() {
        DecodeError::Schema(SchemaError::TypeMismatch { block, field, .. }) => {
            assert_eq!(block, "point");
            assert_eq!(field, "y");
        }
        other => panic!("expected type mismatch, got {:?}", other),
    }
}

// =============================================================================
// Header classification
// =============================================================================

#[test]
fn header_classification() {
    assert_eq!(codec::inspect(b""), Format::Indeterminate);
    assert_eq!(
        codec::inspect(&TextEncoding::Utf16Le.encode(SCENARIO)),
        Format::Uncompressed(Variant::Text)
    );
    assert_eq!(
        codec::inspect(b"SIMISA@F\x00\x10\x00\x00@@@@\x78\x9c\x9d"),
        Format::Compressed
    );
    assert_eq!(codec::inspect(b"SIMISA@@@@"), Format::Indeterminate);
    assert_eq!(codec::inspect(b"JINX0s1t"), Format::Indeterminate);
}

#[test]
fn decode_bytes_in_every_encoding() {
    for encoding in [
        TextEncoding::Utf8,
        TextEncoding::Utf8Bom,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
    ] {
        let shape = codec::decode_bytes(&encoding.encode(SCENARIO), &DecodeOptions::default())
            .unwrap_or_else(|e| panic!("{}: {}", encoding, e));
        assert_eq!(shape.volumes.len(), 1);
    }
}

// =============================================================================
// File round trip
// =============================================================================

#[test]
fn dump_and_load_preserve_graph() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loco.s");

    let mut shape = codec::decode(SCENARIO).unwrap();
    shape.images.push("Loco Body.ace".into());
    shape.matrices.push(Matrix::translation("MAIN", 0.0, 1.2, -3.5));

    let options = SaveOptions {
        format: FormatOptions {
            indent: 2,
            use_tabs: false,
            line_ending: LineEnding::Lf,
        },
        encoding: TextEncoding::Utf8,
    };
    storage::dump(&shape, &path, &options).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("  images ( 1\n    image ( \"Loco Body.ace\" )\n  )\n"));
    assert!(text.contains("    matrix MAIN ( 1 0 0 0 1 0 0 0 1 0 1.2 -3.5 )\n"));

    assert_eq!(storage::load(&path, &DecodeOptions::default()).unwrap(), shape);
}

// =============================================================================
// Property: decode(encode(G)) == G
// =============================================================================

fn float() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        Just(1.0),
        -1.0e6..1.0e6f64,
        -1.0..1.0f64,
        (1.0e15..1.0e20f64),
        (1.0e-9..1.0e-5f64),
    ]
}

fn hex() -> impl Strategy<Value = Hex32> {
    any::<u32>().prop_map(Hex32)
}

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.][A-Za-z0-9_. -]{0,11}"
}

fn small_vec<T: std::fmt::Debug>(
    item: impl Strategy<Value = T>,
) -> impl Strategy<Value = Vec<T>> {
    prop::collection::vec(item, 0..3)
}

fn vector() -> impl Strategy<Value = Vector> {
    (float(), float(), float()).prop_map(|(x, y, z)| Vector::new(x, y, z))
}

fn matrix() -> impl Strategy<Value = Matrix> {
    (text(), prop::array::uniform12(float()))
        .prop_map(|(name, c)| Matrix::from_components(name, c))
}

fn texture() -> impl Strategy<Value = Texture> {
    (any::<i32>(), any::<i32>(), float(), hex()).prop_map(
        |(image_index, filter_mode, mipmap_lod_bias, border_colour)| Texture {
            image_index,
            filter_mode,
            mipmap_lod_bias,
            border_colour,
        },
    )
}

fn light_material() -> impl Strategy<Value = LightMaterial> {
    (hex(), prop::array::uniform4(any::<i32>()), float()).prop_map(|(flags, c, spec_power)| {
        LightMaterial {
            flags,
            diff_colour_index: c[0],
            amb_colour_index: c[1],
            spec_colour_index: c[2],
            emissive_colour_index: c[3],
            spec_power,
        }
    })
}

fn uv_op() -> impl Strategy<Value = UvOp> {
    let i = any::<i32>;
    prop_oneof![
        (i(), i()).prop_map(|(a, b)| UvOp::Copy {
            texture_address_mode: a,
            source_uv_index: b,
        }),
        i().prop_map(|a| UvOp::ReflectMapFull {
            texture_address_mode: a
        }),
        i().prop_map(|a| UvOp::ReflectMap {
            texture_address_mode: a
        }),
        (i(), i(), i(), i()).prop_map(|(a, b, c, d)| UvOp::UniformScale {
            texture_address_mode: a,
            source_uv_index: b,
            unknown3: c,
            unknown4: d,
        }),
        (i(), i(), i(), i()).prop_map(|(a, b, c, d)| UvOp::NonUniformScale {
            texture_address_mode: a,
            source_uv_index: b,
            unknown3: c,
            unknown4: d,
        }),
    ]
}

fn vtx_state() -> impl Strategy<Value = VtxState> {
    (
        hex(),
        prop::array::uniform3(any::<i32>()),
        hex(),
        proptest::option::of(any::<i32>()),
    )
        .prop_map(|(flags, i, light_flags, matrix2_index)| VtxState {
            flags,
            matrix_index: i[0],
            light_material_index: i[1],
            light_model_cfg_index: i[2],
            light_flags,
            matrix2_index,
        })
}

fn prim_state() -> impl Strategy<Value = PrimState> {
    (
        text(),
        hex(),
        any::<i32>(),
        small_vec(any::<i32>()),
        float(),
        prop::array::uniform4(any::<i32>()),
    )
        .prop_map(|(name, flags, shader_index, texture_indices, z_bias, i)| PrimState {
            name,
            flags,
            shader_index,
            texture_indices,
            z_bias,
            vtx_state_index: i[0],
            alpha_test_mode: i[1],
            light_cfg_index: i[2],
            z_buffer_mode: i[3],
        })
}

fn geometry_info() -> impl Strategy<Value = GeometryInfo> {
    let node = (
        prop::array::uniform5(any::<i32>()),
        prop::array::uniform3(any::<i32>()),
    )
        .prop_map(|(n, c)| GeometryNode {
            tx_light_cmds: n[0],
            node_x_tx_light_cmds: n[1],
            trilists: n[2],
            line_lists: n[3],
            pt_lists: n[4],
            cullable_prims: CullablePrims {
                prims: c[0],
                flat_sections: c[1],
                prim_indices: c[2],
            },
        });

    (
        prop::array::uniform10(any::<i32>()),
        small_vec(node),
        small_vec(any::<i32>()),
    )
        .prop_map(|(c, geometry_nodes, geometry_node_map)| GeometryInfo {
            face_normals: c[0],
            tx_light_cmds: c[1],
            node_x_tx_light_cmds: c[2],
            trilist_indices: c[3],
            line_list_indices: c[4],
            node_x_trilist_indices: c[5],
            trilists: c[6],
            line_lists: c[7],
            pt_lists: c[8],
            node_x_trilists: c[9],
            geometry_nodes,
            geometry_node_map,
        })
}

fn sub_object() -> impl Strategy<Value = SubObject> {
    let header = (
        (hex(), any::<i32>(), any::<i32>(), hex(), hex()),
        geometry_info(),
        small_vec(any::<i32>()),
        small_vec(any::<i32>()),
        any::<i32>(),
    )
        .prop_map(
            |((flags, sort, volume, src, dst), geometry_info, shaders, light_cfgs, id)| {
                SubObjectHeader {
                    flags,
                    sort_vector_index: sort,
                    volume_index: volume,
                    source_vtx_fmt_flags: src,
                    destination_vtx_fmt_flags: dst,
                    geometry_info,
                    subobject_shaders: shaders,
                    subobject_light_cfgs: light_cfgs,
                    subobject_id: id,
                }
            },
        );

    let vertex = (hex(), any::<i32>(), any::<i32>(), hex(), hex(), small_vec(any::<i32>()))
        .prop_map(|(flags, point_index, normal_index, colour1, colour2, vertex_uvs)| Vertex {
            flags,
            point_index,
            normal_index,
            colour1,
            colour2,
            vertex_uvs,
        });

    let vertex_set = prop::array::uniform3(any::<i32>()).prop_map(|v| VertexSet {
        vtx_state: v[0],
        vtx_start_index: v[1],
        vtx_count: v[2],
    });

    let trilist = (
        small_vec(prop::array::uniform3(any::<i32>()).prop_map(|v| VertexIdx::new(v[0], v[1], v[2]))),
        small_vec((any::<i32>(), any::<i32>()).prop_map(|(i, u)| NormalIdx::new(i, u))),
        small_vec(hex()),
    )
        .prop_map(|(vertex_idxs, normal_idxs, flags)| IndexedTrilist {
            vertex_idxs,
            normal_idxs,
            flags,
        });

    let primitive = (0..4i32, trilist).prop_map(|(prim_state_index, indexed_trilist)| Primitive {
        prim_state_index,
        indexed_trilist,
    });

    (header, small_vec(vertex), small_vec(vertex_set), small_vec(primitive)).prop_map(
        |(sub_object_header, vertices, vertex_sets, primitives)| SubObject {
            sub_object_header,
            vertices,
            vertex_sets,
            primitives,
        },
    )
}

fn lod_control() -> impl Strategy<Value = LodControl> {
    let level = (any::<i32>(), small_vec(any::<i32>()), small_vec(sub_object())).prop_map(
        |(dlevel_selection, hierarchy, sub_objects)| DistanceLevel {
            distance_level_header: DistanceLevelHeader {
                dlevel_selection,
                hierarchy,
            },
            sub_objects,
        },
    );

    (any::<i32>(), small_vec(level)).prop_map(|(dlevel_bias, distance_levels)| LodControl {
        distance_levels_header: DistanceLevelsHeader { dlevel_bias },
        distance_levels,
    })
}

fn controller() -> impl Strategy<Value = Controller> {
    let slerp = (any::<i32>(), prop::array::uniform4(float())).prop_map(|(frame, v)| {
        KeyPosition::SlerpRot {
            frame,
            x: v[0],
            y: v[1],
            z: v[2],
            w: v[3],
        }
    });
    let linear = (any::<i32>(), prop::array::uniform3(float())).prop_map(|(frame, v)| {
        KeyPosition::LinearKey {
            frame,
            x: v[0],
            y: v[1],
            z: v[2],
        }
    });
    let tcb = || {
        (any::<i32>(), prop::array::uniform9(float())).prop_map(|(frame, v)| KeyPosition::TcbKey {
            frame,
            x: v[0],
            y: v[1],
            z: v[2],
            w: v[3],
            tension: v[4],
            continuity: v[5],
            bias: v[6],
            in_: v[7],
            out: v[8],
        })
    };

    prop_oneof![
        small_vec(prop_oneof![slerp, tcb()]).prop_map(|keys| Controller {
            kind: ControllerKind::TcbRot,
            keys,
        }),
        small_vec(linear).prop_map(|keys| Controller {
            kind: ControllerKind::LinearPos,
            keys,
        }),
        small_vec(tcb()).prop_map(|keys| Controller {
            kind: ControllerKind::TcbPos,
            keys,
        }),
    ]
}

fn animation() -> impl Strategy<Value = Animation> {
    let node = (text(), small_vec(controller()))
        .prop_map(|(name, controllers)| AnimNode { name, controllers });

    (any::<i32>(), any::<i32>(), small_vec(node)).prop_map(
        |(frame_count, frame_rate, anim_nodes)| Animation {
            frame_count,
            frame_rate,
            anim_nodes,
        },
    )
}

fn shape() -> impl Strategy<Value = Shape> {
    let geometry = (
        small_vec(vector().prop_flat_map(|v| float().prop_map(move |r| VolumeSphere::new(v, r)))),
        small_vec(text()),
        small_vec(text()),
        small_vec(vector().prop_map(|v| Point::new(v.x, v.y, v.z))),
        small_vec((float(), float()).prop_map(|(u, v)| UvPoint::new(u, v))),
        small_vec(vector()),
        small_vec(vector()),
        small_vec(prop::array::uniform4(float()).prop_map(|c| Colour::new(c[0], c[1], c[2], c[3]))),
        small_vec(matrix()),
    );
    let materials = (
        small_vec(text()),
        small_vec(texture()),
        small_vec(light_material()),
        small_vec((hex(), small_vec(uv_op())).prop_map(|(flags, uv_ops)| LightModelCfg {
            flags,
            uv_ops,
        })),
        small_vec(vtx_state()),
        small_vec(prim_state()),
    );

    (
        (hex(), hex()),
        geometry,
        materials,
        prop::collection::vec(lod_control(), 0..2),
        proptest::option::of(small_vec(animation())),
    )
        .prop_map(
            |(
                (flags1, flags2),
                (volumes, shader_names, filters, points, uv_points, normals, sort_vectors, colours, matrices),
                (images, textures, light_materials, light_model_cfgs, vtx_states, prim_states),
                lod_controls,
                animations,
            )| Shape {
                shape_header: ShapeHeader::new(flags1, flags2),
                volumes,
                shader_names,
                texture_filter_names: filters,
                points,
                uv_points,
                normals,
                sort_vectors,
                colours,
                matrices,
                images,
                textures,
                light_materials,
                light_model_cfgs,
                vtx_states,
                prim_states,
                lod_controls,
                animations,
            },
        )
}

fn format_options() -> impl Strategy<Value = FormatOptions> {
    (0..4usize, any::<bool>(), any::<bool>()).prop_map(|(indent, use_tabs, crlf)| FormatOptions {
        indent,
        use_tabs,
        line_ending: if crlf { LineEnding::Crlf } else { LineEnding::Lf },
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn round_trip(shape in shape(), options in format_options()) {
        let text = codec::encode_with(&shape, &options).unwrap();
        let decoded = codec::decode(&text).unwrap();
        prop_assert_eq!(decoded, shape);
    }

    #[test]
    fn encoding_is_stable(shape in shape()) {
        let first = codec::encode(&shape).unwrap();
        let second = codec::encode(&codec::decode(&first).unwrap()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn round_trip_through_utf16(shape in shape()) {
        let bytes = TextEncoding::Utf16Le.encode(&codec::encode(&shape).unwrap());
        let decoded = codec::decode_bytes(&bytes, &DecodeOptions::default()).unwrap();
        prop_assert_eq!(decoded, shape);
    }
}
