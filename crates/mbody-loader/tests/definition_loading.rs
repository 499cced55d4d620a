//! Definition Loading Tests
//!
//! Loads the shipped definition folders and checks:
//! 1. Registries pick up every definition file
//! 2. Loaded pendulums match their textbook mass matrices and forces
//! 3. Each error class surfaces from a malformed system
//! 4. Definitions and configuration survive a JSON round trip

use std::path::PathBuf;

use approx::assert_relative_eq;
use nalgebra::Vector3;

use mbody_core::dynamics::MultibodySystem;
use mbody_core::kinematics::Dof;
use mbody_loader::{
    ElementDefinition, ElementRegistry, JointDefinition, JointRegistry, LoadError, LoaderConfig,
    SystemDefinition, SystemLoader,
};

fn definitions() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("definitions")
}

fn loader() -> SystemLoader {
    SystemLoader::from_config(&LoaderConfig::with_root(definitions())).unwrap()
}

fn system_xml(name: &str) -> String {
    std::fs::read_to_string(definitions().join("systems").join(name)).unwrap()
}

fn update(system: &mut MultibodySystem, q: &[f64], u: &[f64]) {
    let mut values = [q, u].concat();
    let state = system.state_vector(&mut values);
    system.update_elements(&state);
}

mod registry_tests {
    use super::*;

    #[test]
    fn test_load_definition_folders() {
        let loader = loader();
        assert_eq!(loader.elements().len(), 3);
        assert_eq!(loader.joints().len(), 7);

        assert!(loader.elements().contains("Rod"));
        assert!(loader.elements().contains("point mass"));
        assert!(loader.joints().contains("REVOLUTE Y"));

        let spherical = loader.joints().get("spherical").unwrap();
        assert_eq!(spherical.free_flags(), [false, false, false, true, true, true]);
        let free = loader.joints().get("free").unwrap();
        assert_eq!(free.free_flags(), [true; 6]);
        let fixed = loader.joints().get("fixed").unwrap();
        assert_eq!(fixed.free_flags(), [false; 6]);
    }

    #[test]
    fn test_extension_filter() {
        let mut elements = ElementRegistry::new();
        let count = elements.load_folder(definitions().join("elements"), "jdf").unwrap();
        assert_eq!(count, 0);
        assert!(elements.is_empty());
    }

    #[test]
    fn test_missing_folder_is_io_error() {
        let config = LoaderConfig::with_root(definitions().join("does-not-exist"));
        assert!(matches!(SystemLoader::from_config(&config), Err(LoadError::Io(_))));
    }
}

mod pendulum_tests {
    use super::*;

    // simple_pendulum.xml: rod of mass 2 and length 1.5 hinged about y
    const MASS: f64 = 2.0;
    const LENGTH: f64 = 1.5;

    #[test]
    fn test_simple_pendulum_structure() {
        let system = loader().load_file(definitions().join("systems/simple_pendulum.xml")).unwrap();
        assert_eq!(system.num_elements(), 1);
        assert_eq!(system.total_degrees_of_freedom(), 1);

        let rod = system.find_element("rod").unwrap();
        assert_eq!(rod.joint.free_degrees_of_freedom(), &[Dof::Beta]);
        assert_relative_eq!(rod.mass, MASS);
        assert_relative_eq!(rod.frames.offset_origin(rod.cog_frame), Vector3::new(LENGTH / 2.0, 0.0, 0.0));
        assert_relative_eq!(*system.gravity(), Vector3::new(0.0, 0.0, -9.81));
    }

    #[test]
    fn test_mass_matrix_is_hinge_inertia() {
        let mut system = loader().parse(&system_xml("simple_pendulum.xml")).unwrap();
        update(&mut system, &[0.0], &[0.0]);

        let i_yy = MASS * LENGTH * LENGTH / 12.0;
        assert_relative_eq!(system.global_mass_matrix()[(0, 0)], i_yy, epsilon = 1e-12);
        // about the hinge: I + m·(l/2)²
        assert_relative_eq!(
            system.generalized_mass_matrix()[(0, 0)],
            MASS * LENGTH * LENGTH / 3.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_gravity_torque() {
        let mut system = loader().parse(&system_xml("simple_pendulum.xml")).unwrap();
        for angle in [0.0, 0.4, -1.1] {
            update(&mut system, &[angle], &[0.0]);
            let torque = system.generalized_force_vector()[0];
            assert_relative_eq!(torque, MASS * 9.81 * LENGTH / 2.0 * f64::cos(angle), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_double_pendulum_mass_matrix() {
        // unit masses and lengths
        let (i, lc, l1) = (1.0 / 12.0, 0.5, 1.0);
        let (t1, t2) = (0.3, 0.7);

        let mut system = loader().parse(&system_xml("double_pendulum.xml")).unwrap();
        assert_eq!(system.elements()[0].name, "upper");
        assert_eq!(system.elements()[1].parent(), Some(0));
        update(&mut system, &[t1, t2], &[0.0, 0.0]);

        let c2 = f64::cos(t2);
        let mass = system.generalized_mass_matrix();
        assert_relative_eq!(mass[(0, 0)], 2.0 * i + lc * lc + l1 * l1 + lc * lc + 2.0 * l1 * lc * c2, epsilon = 1e-12);
        assert_relative_eq!(mass[(0, 1)], i + lc * lc + l1 * lc * c2, epsilon = 1e-12);
        assert_relative_eq!(mass[(1, 1)], i + lc * lc, epsilon = 1e-12);
    }

    #[test]
    fn test_floating_box_with_local_override() {
        let mut system = loader().parse(&system_xml("floating_box.xml")).unwrap();
        assert_eq!(system.total_degrees_of_freedom(), 7);

        let payload = system.find_element("payload").unwrap();
        assert_relative_eq!(payload.mass, 0.5);
        let body = system.find_element("box").unwrap();
        assert_relative_eq!(body.mass, 4.0);
        assert_relative_eq!(body.inertia[(2, 2)], 0.4);

        update(&mut system, &[0.0; 7], &[0.0; 7]);
        let payload = system.find_element("payload").unwrap();
        assert_relative_eq!(payload.cog_position(), Vector3::new(0.0, 0.0, 0.25), epsilon = 1e-12);

        // the free box carries the weight of both bodies along z
        let force = system.generalized_force_vector();
        assert_relative_eq!(force[2], -4.5 * 9.81, epsilon = 1e-12);
    }
}

mod error_tests {
    use super::*;

    fn pendulum_with(from: &str, to: &str) -> Result<MultibodySystem, LoadError> {
        let xml = system_xml("double_pendulum.xml");
        assert!(xml.contains(from));
        loader().parse(&xml.replace(from, to))
    }

    #[test]
    fn test_definition_errors() {
        let err = pendulum_with("<Bodies>", "<Body>").unwrap_err();
        assert!(matches!(err, LoadError::Xml(_)), "{err}");

        let err = pendulum_with(r#"<Body name="upper" type="rod">"#, r#"<Body name="upper">"#).unwrap_err();
        assert!(matches!(err, LoadError::BadDefinition { .. }), "{err}");
    }

    #[test]
    fn test_registry_errors() {
        let err = pendulum_with(r#"type="rod""#, r#"type="beam""#).unwrap_err();
        assert!(matches!(err, LoadError::DefinitionNotFound { kind: "element", .. }), "{err}");

        let mut joints = JointRegistry::new();
        joints.load_default_folder(definitions().join("joints")).unwrap();
        let err = joints
            .load_file(definitions().join("joints/free.jdf"))
            .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateDefinition { kind: "joint", .. }), "{err}");
    }

    #[test]
    fn test_parameter_errors() {
        let err = pendulum_with(r#"name="length""#, r#"name="span""#).unwrap_err();
        assert!(matches!(err, LoadError::ParameterNotFound { .. }), "{err}");
    }

    #[test]
    fn test_topology_errors() {
        let err = pendulum_with(r#"remote="upper/tip""#, r#"remote="middle/tip""#).unwrap_err();
        assert!(matches!(err, LoadError::UnknownBody { .. }), "{err}");
        assert!(err.is_topology());

        let err = pendulum_with(r#"remote="upper/tip""#, r#"remote="upper/elbow""#).unwrap_err();
        assert!(matches!(err, LoadError::UnknownFrame { .. }), "{err}");

        let err = pendulum_with(r#"remote="upper/tip""#, r#"remote="lower""#).unwrap_err();
        assert!(matches!(err, LoadError::SelfLink(_)), "{err}");

        // upper hangs from lower and lower from upper: no root
        let err = pendulum_with(r#"remote="base""#, r#"remote="lower/tip""#).unwrap_err();
        assert!(matches!(err, LoadError::System(_)), "{err}");
        assert!(err.is_topology());
    }
}

mod serde_tests {
    use super::*;
    use mbody_loader::Definition;

    #[test]
    fn test_definition_round_trip_gives_same_system() {
        let loader = loader();
        let rod = loader.elements().get("rod").unwrap();
        let hinge = loader.joints().get("revolute y").unwrap();

        let rod: ElementDefinition = serde_json::from_str(&serde_json::to_string(rod).unwrap()).unwrap();
        let hinge: JointDefinition = serde_json::from_str(&serde_json::to_string(hinge).unwrap()).unwrap();
        assert_eq!(rod.name(), "Rod");

        let mut elements = ElementRegistry::new();
        elements.register(rod).unwrap();
        let mut joints = JointRegistry::new();
        joints.register(hinge).unwrap();
        let copy = SystemLoader::new(elements, joints);

        let definition = SystemDefinition::parse(&system_xml("double_pendulum.xml")).unwrap();
        let definition: SystemDefinition =
            serde_json::from_str(&serde_json::to_string(&definition).unwrap()).unwrap();

        let (q, u) = ([0.2, -0.5], [0.7, 1.3]);
        let mut original = loader.parse(&system_xml("double_pendulum.xml")).unwrap();
        let mut restored = copy.build(&definition).unwrap();
        update(&mut original, &q, &u);
        update(&mut restored, &q, &u);

        assert_relative_eq!(original.generalized_mass_matrix(), restored.generalized_mass_matrix(), epsilon = 1e-12);
        assert_relative_eq!(original.global_jacobian(), restored.global_jacobian(), epsilon = 1e-12);
        assert_relative_eq!(original.coriolis_vector(), restored.coriolis_vector(), epsilon = 1e-12);
    }

    #[test]
    fn test_config_round_trip() {
        let config = LoaderConfig::with_root("/srv/mbody");
        let json = serde_json::to_string(&config).unwrap();
        let restored: LoaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);

        // missing fields fall back to defaults
        let partial: LoaderConfig = serde_json::from_str(r#"{"joint_extension":"joint"}"#).unwrap();
        assert_eq!(partial.joint_extension, "joint");
        assert_eq!(partial.element_extension, "edf");
    }
}
