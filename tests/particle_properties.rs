//! Property tests for the particle force model.

use glam::DVec2;
use proptest::prelude::*;

use route_map_wasm::particle::{
    BodyParams, EdgeParticle, NodeParticle, ParticleId, ParticleParameters, RigidBody,
};

fn body(position: DVec2, rotation: f64, size: DVec2) -> RigidBody {
    RigidBody::new(position, rotation, size, BodyParams::default())
}

proptest! {
    #[test]
    fn repulsion_points_away_from_overlap(
        ax in -5.0f64..5.0,
        ay in -5.0f64..5.0,
        a_rot in -3.2f64..3.2,
        dx in -2.0f64..2.0,
        dy in -2.0f64..2.0,
        b_rot in -3.2f64..3.2,
        aw in 0.5f64..4.0,
        ah in 0.5f64..4.0,
        bw in 0.5f64..4.0,
        bh in 0.5f64..4.0,
    ) {
        let a = body(DVec2::new(ax, ay), a_rot, DVec2::new(aw, ah));
        let b = body(DVec2::new(ax + dx, ay + dy), b_rot, DVec2::new(bw, bh));

        let repulsion = a.repulsion_from(&b);
        let towards_overlap = repulsion.anchor - a.position();
        prop_assert!(repulsion.vector.dot(towards_overlap) <= 0.0);
    }

    #[test]
    fn repulsion_grows_with_overlap_area(
        rotation in -3.2f64..3.2,
        width in 1.0f64..4.0,
        height in 1.0f64..4.0,
        inset in 0.1f64..0.9,
        short in 0.05f64..1.0,
        extra in 0.0f64..1.0,
    ) {
        // The second box always covers the same horizontal strip of the
        // first, so the overlap centroid stays put while its area grows
        // with the second box's height.
        let a = body(DVec2::ZERO, rotation, DVec2::new(width, height));
        let left = width / 2.0 - inset * width;
        let strip = DVec2::new(left + width / 2.0, 0.0);
        let center = DVec2::from_angle(rotation).rotate(strip);

        let low_height = short * height;
        let high_height = low_height + extra * height;
        let low = body(center, rotation, DVec2::new(width, low_height));
        let high = body(center, rotation, DVec2::new(width, high_height));

        let weak = a.repulsion_from(&low).vector.length();
        let strong = a.repulsion_from(&high).vector.length();
        prop_assert!(strong >= weak - 1e-9, "{} < {}", strong, weak);
    }

    #[test]
    fn sleeping_body_stays_put(
        x in -100.0f64..100.0,
        y in -100.0f64..100.0,
        rotation in -10.0f64..10.0,
        w in 0.1f64..5.0,
        h in 0.1f64..5.0,
        dt in 0.001f64..2.0,
    ) {
        let mut sleeper = body(DVec2::new(x, y), rotation, DVec2::new(w, h));
        let moved = sleeper.update(dt);
        prop_assert_eq!(moved, 0.0);
        prop_assert_eq!(sleeper.position().x.to_bits(), x.to_bits());
        prop_assert_eq!(sleeper.position().y.to_bits(), y.to_bits());
        prop_assert_eq!(sleeper.rotation().to_bits(), rotation.to_bits());
    }

    #[test]
    fn out_of_radius_has_no_effect(
        angle in -3.2f64..3.2,
        margin in 0.001f64..50.0,
        rotation in -3.2f64..3.2,
        attracted in any::<bool>(),
    ) {
        let params = ParticleParameters::default();
        let distance = params.interaction_radius + margin;
        let far = DVec2::from_angle(angle) * distance;

        let node = NodeParticle::particle(ParticleId(0), "Amon Ereb", DVec2::ZERO, &params);
        let edge = EdgeParticle::new("red", "Amon Ereb", "Rerir", 0, 0, &params)
            .into_particle(ParticleId(1), far, rotation, &params);

        let on_edge = edge.interaction(&node, attracted).unwrap();
        let on_node = node.interaction(&edge, attracted).unwrap();
        prop_assert!(on_edge.is_zero());
        prop_assert!(on_node.is_zero());
    }
}
