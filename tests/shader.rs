use layer_composite_wasm::shader::{
    clip_position, fragment_source, sampler_name, vertex_source, LayerCount, QUAD,
};

fn positions(src: &str, needle_for: impl Fn(usize) -> String, n: usize) -> Vec<usize> {
    (0..n)
        .map(|i| {
            let needle = needle_for(i);
            assert_eq!(src.matches(needle.as_str()).count(), 1, "{needle}");
            src.find(needle.as_str()).unwrap()
        })
        .collect()
}

#[test]
fn one_sampler_and_one_composite_per_layer_in_order() {
    for n in 1..=16 {
        let src = fragment_source(LayerCount::new(n).unwrap());

        assert_eq!(src.matches("uniform sampler2D ").count(), n);
        assert_eq!(src.matches("color = composite(").count(), n);

        let decls = positions(&src, |i| format!("uniform sampler2D {};", sampler_name(i)), n);
        let calls = positions(&src, |i| format!("texture({}, uv)", sampler_name(i)), n);
        assert!(decls.windows(2).all(|w| w[0] < w[1]), "declarations out of order for {n}");
        assert!(calls.windows(2).all(|w| w[0] < w[1]), "composites out of order for {n}");
        assert!(decls.last() < calls.first());
        assert!(!src.contains(&format!("{};", sampler_name(n))));
    }
}

#[test]
fn generation_is_deterministic() {
    let layers = LayerCount::new(5).unwrap();
    assert_eq!(fragment_source(layers), fragment_source(layers));
}

#[test]
fn output_alpha_is_forced_opaque() {
    let src = fragment_source(LayerCount::new(3).unwrap());
    let writes: Vec<&str> = src.lines().filter(|l| l.contains("fragcolor =")).collect();
    assert_eq!(writes, ["  fragcolor = vec4(clamp(color, 0., 1.), 1.);"]);
}

#[test]
fn vertex_stage_maps_unit_square_to_clip_space() {
    assert!(vertex_source().contains("vec2 full_pos = 2. * a_uv - 1.;"));
    assert!(vertex_source().contains("uv = a_uv;"));

    assert_eq!(clip_position([0., 0.]), [-1., -1.]);
    assert_eq!(clip_position([1., 1.]), [1., 1.]);
    assert_eq!(clip_position([0.5, 0.5]), [0., 0.]);

    let clip: Vec<[f32; 2]> = QUAD.chunks(2).map(|c| clip_position([c[0], c[1]])).collect();
    assert_eq!(clip, [[-1., 1.], [-1., -1.], [1., 1.], [1., -1.]]);
}
