//! Example scene demonstrating hierarchical transforms

use std::f64::consts::TAU;

use transform2d::prelude::*;

/// Sun, planet, and moon, each orbiting its parent
struct Orrery {
    tree: TransformTree,
    sun: NodeId,
    planet_orbit: NodeId,
    planet: NodeId,
    moon_orbit: NodeId,
    moon: NodeId,
}

impl Orrery {
    fn new() -> Result<Self, TransformError> {
        let mut tree = TransformTree::with_config(TreeConfig::default().with_capacity(8));

        let sun = tree.spawn(Transform2D::from_position(DVec2::new(400.0, 300.0)));
        let planet_orbit = tree.create(NodeDesc::default().with_parent(sun))?;
        let planet_local =
            Transform2D::from_position(DVec2::new(150.0, 0.0)).with_uniform_scale(0.5);
        let planet = tree.create(NodeDesc::new(planet_local).with_parent(planet_orbit))?;
        let moon_orbit = tree.create(NodeDesc::default().with_parent(planet))?;
        let moon = tree.create(
            NodeDesc::new(Transform2D::from_position(DVec2::new(60.0, 0.0)))
                .with_parent(moon_orbit),
        )?;

        Ok(Self {
            tree,
            sun,
            planet_orbit,
            planet,
            moon_orbit,
            moon,
        })
    }

    fn update(&mut self, dt: f64) -> Result<(), TransformError> {
        self.tree.rotate(self.planet_orbit, TAU / 12.0 * dt)?;
        self.tree.rotate(self.moon_orbit, TAU / 3.0 * dt)?;
        self.tree.translate(self.sun, DVec2::new(5.0 * dt, 0.0))?;
        Ok(())
    }

    fn report(&self, frame: u32) -> Result<(), TransformError> {
        let planet = self.tree.world_position(self.planet)?;
        let moon = self.tree.world_position(self.moon)?;
        let from_sun = self.tree.dist(self.sun, self.moon)?;
        let moon_seen_from_planet =
            self.tree.distant_to_local(self.planet, self.moon, DVec2::ZERO)?;

        log::info!(
            "frame {frame}: planet ({:.2}, {:.2}) moon ({:.2}, {:.2}) sun->moon {:.2}, moon in planet frame ({:.2}, {:.2})",
            planet.x,
            planet.y,
            moon.x,
            moon.y,
            from_sun.length(),
            moon_seen_from_planet.x,
            moon_seen_from_planet.y,
        );
        Ok(())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut orrery = match Orrery::new() {
        Ok(orrery) => orrery,
        Err(e) => {
            log::error!("Failed to build scene: {e}");
            std::process::exit(1);
        }
    };

    let dt = 0.5;
    for frame in 0..8 {
        if let Err(e) = orrery.update(dt).and_then(|()| orrery.report(frame)) {
            log::error!("Frame {frame} failed: {e}");
            std::process::exit(1);
        }
    }

    let stats = orrery.tree.stats();
    log::info!(
        "{} nodes, {} recomputations, {} invalidations",
        orrery.tree.len(),
        stats.recomputations,
        stats.invalidations
    );
}
