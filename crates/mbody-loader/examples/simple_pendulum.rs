//! Simple Pendulum
//!
//! Loads `definitions/systems/simple_pendulum.xml`, releases the rod from
//! horizontal and integrates the projected equations of motion
//!
//! ```text
//! Jᵀ·M̄·J · u̇ = Jᵀ·q_e - Jᵀ·(M̄·J̇·u + g_ω)
//! ```
//!
//! with semi-implicit Euler, printing the swing angle and total energy.

use std::path::Path;

use mbody_core::dynamics::MultibodySystem;
use mbody_loader::{LoaderConfig, SystemLoader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== mbody Simple Pendulum ===\n");

    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("definitions");
    let loader = SystemLoader::from_config(&LoaderConfig::with_root(&root))?;
    println!(
        "Registered {} element and {} joint definitions",
        loader.elements().len(),
        loader.joints().len()
    );

    let mut system = loader.load_file(root.join("systems/simple_pendulum.xml"))?;
    let n = system.total_degrees_of_freedom();
    println!("System: {} bodies, {} DOF\n", system.num_elements(), n);

    let dt = 1e-3;
    let steps = 2000;
    let mut values = vec![0.0; system.state_len()];

    for step in 0..=steps {
        update(&mut system, &mut values);

        if step % 200 == 0 {
            println!(
                "t = {:5.2} s  angle = {:+7.3} rad  energy = {:8.4} J",
                step as f64 * dt,
                values[0],
                energy(&system)
            );
        }

        let mass = system.generalized_mass_matrix();
        let rhs = system.generalized_force_vector() - system.generalized_coriolis_vector();
        let Some(acceleration) = mass.lu().solve(&rhs) else {
            println!("mass matrix became singular at step {step}");
            break;
        };

        for i in 0..n {
            values[n + i] += dt * acceleration[i];
            values[i] += dt * values[n + i];
        }
    }

    Ok(())
}

fn update(system: &mut MultibodySystem, values: &mut [f64]) {
    let state = system.state_vector(values);
    system.update_elements(&state);
}

/// Kinetic plus potential energy, zero potential at z = 0
fn energy(system: &MultibodySystem) -> f64 {
    system
        .elements()
        .iter()
        .map(|element| {
            let v = element.cog_velocity();
            let w = element.angular_velocity();
            let kinetic = 0.5 * element.mass * v.norm_squared()
                + 0.5 * w.dot(&(element.global_inertia() * w));
            let potential = -element.mass * system.gravity().dot(&element.cog_position());
            kinetic + potential
        })
        .sum()
}
