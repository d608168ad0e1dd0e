//! ---
//! pms_section: "02-address-space-data-model"
//! pms_subsection: "module"
//! pms_type: "source"
//! pms_scope: "code"
//! pms_description: "Fixed station catalog with the reference identifier scheme."
//! pms_version: "v0.1.0"
//! pms_owner: "tbd"
//! ---
use r_pms_common::config::{AppConfig, ModuleKind};
use r_pms_model::{
    fields, methods, Constraint, MethodParameter, MethodTemplate, TypeHandle, TypeRegistry, Value,
    ValueKind, VariableTemplate,
};
use r_pms_store::{BindingTable, VariableStore};
use tracing::info;

use crate::builder::{AddressSpaceBuilder, ModuleInstance};
use crate::space::AddressSpace;
use crate::Result;

/// Namespace of the station's own nodes.
pub const GATEWAY_NAMESPACE: u16 = 1;

/// Identifier of the StationGateway object. The reference catalog pins
/// 1011 (gateway), 1012 (StationId), 1013 (StationName).
pub const GATEWAY_OBJECT_ID: u32 = 1011;

/// Register the two platform module types.
///
/// `AdvancedModuleType` extends `BaseModuleType`: it inherits system state,
/// temperature, and the plain alarm method, and adds crowd monitoring plus
/// the leveled alarm.
pub fn platform_types() -> Result<(TypeRegistry, TypeHandle, TypeHandle)> {
    let mut registry = TypeRegistry::new();

    let base = registry.define_type("BaseModuleType", None)?;
    registry.add_variable_template(
        base,
        VariableTemplate::new(
            fields::SYSTEM_STATE,
            Constraint::IntRange { min: 0, max: 2 },
            Value::Int32(0),
        ),
    )?;
    registry.add_variable_template(
        base,
        VariableTemplate::new(fields::TEMPERATURE, Constraint::None, Value::Double(22.0)),
    )?;
    registry.add_method_template(
        base,
        MethodTemplate::new(
            methods::SET_ALARM,
            vec![MethodParameter::new("active", ValueKind::Boolean)],
        ),
    )?;

    let advanced = registry.define_type("AdvancedModuleType", Some(base))?;
    registry.add_variable_template(
        advanced,
        VariableTemplate::new(
            fields::CROWD_LEVEL,
            Constraint::Range { min: 0.0, max: 100.0 },
            Value::Double(0.0),
        ),
    )?;
    registry.add_method_template(
        advanced,
        MethodTemplate::new(
            methods::SET_ALARM_WITH_LEVEL,
            vec![
                MethodParameter::new("active", ValueKind::Boolean),
                MethodParameter::new("sound_level", ValueKind::Double),
            ],
        ),
    )?;

    Ok((registry, base, advanced))
}

/// Fully built server-side address space.
#[derive(Debug)]
pub struct StationAddressSpace {
    pub space: AddressSpace,
    pub bindings: BindingTable,
    pub modules: Vec<ModuleInstance>,
}

/// Build the station described by `config` on top of `store`.
///
/// Registers the hidden alarm fields for every module alongside the
/// browsable variables; those are reachable only through method calls.
pub fn build_station(config: &AppConfig, store: &VariableStore) -> Result<StationAddressSpace> {
    let (registry, base_type, advanced_type) = platform_types()?;
    let mut builder = AddressSpaceBuilder::new(GATEWAY_NAMESPACE);

    let gateway = builder.add_gateway(
        GATEWAY_OBJECT_ID,
        "StationGateway",
        "Station Gateway",
        &[
            ("StationId", "Station ID", Value::Text(config.station.id.clone())),
            (
                "StationName",
                "Station Name",
                Value::Text(config.station.name.clone()),
            ),
        ],
    )?;

    let mut modules = Vec::new();
    for (module_key, module) in &config.modules {
        let type_handle = match module.kind {
            ModuleKind::Base => base_type,
            ModuleKind::Advanced => advanced_type,
        };
        let mut overrides: Vec<(&str, Value)> = vec![
            (fields::SYSTEM_STATE, module.initial_state.as_value()),
            (fields::TEMPERATURE, Value::Double(module.baseline_temperature)),
        ];
        if let Some(crowd) = module.initial_crowd {
            overrides.push((fields::CROWD_LEVEL, Value::Double(crowd)));
        }

        let instance = builder.instantiate(
            &registry,
            type_handle,
            gateway,
            &module.browse_name,
            &module.display_name,
            module_key,
            module.base_id,
            store,
            &overrides,
        )?;

        store.register(module_key, fields::ALARM_ACTIVE, Value::Boolean(false), Constraint::None)?;
        store.register(module_key, fields::SOUND_LEVEL, Value::Double(0.0), Constraint::None)?;
        modules.push(instance);
    }

    let (space, bindings) = builder.finish();
    info!(
        station = %config.station.id,
        modules = modules.len(),
        nodes = space.node_count(),
        "station address space built"
    );
    Ok(StationAddressSpace {
        space,
        bindings,
        modules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use r_pms_model::{NodeClass, NodeId, SystemState};

    #[test]
    fn reference_identifiers_are_bit_exact() {
        let config = AppConfig::default();
        let store = VariableStore::new();
        let station = build_station(&config, &store).expect("build");

        let expect_variable = |id: u32, name: &str| {
            let node = station
                .space
                .node(NodeId::new(1, id))
                .unwrap_or_else(|| panic!("missing node i={id}"));
            assert_eq!(node.browse_name(), name, "i={id}");
            assert_eq!(node.node_class(), NodeClass::Variable, "i={id}");
        };

        assert_eq!(
            station
                .space
                .node(NodeId::new(1, 1011))
                .expect("gateway")
                .browse_name(),
            "StationGateway"
        );
        expect_variable(1012, "StationId");
        expect_variable(1013, "StationName");

        for (base, has_crowd) in [(1014, false), (1017, false), (1020, true), (1024, true)] {
            let node = station
                .space
                .node(NodeId::new(1, base))
                .unwrap_or_else(|| panic!("missing module i={base}"));
            assert_eq!(node.node_class(), NodeClass::Object);
            expect_variable(base + 1, fields::SYSTEM_STATE);
            expect_variable(base + 2, fields::TEMPERATURE);
            if has_crowd {
                expect_variable(base + 3, fields::CROWD_LEVEL);
            }
        }
    }

    #[test]
    fn seeds_follow_the_module_catalog() {
        let config = AppConfig::default();
        let store = VariableStore::new();
        build_station(&config, &store).expect("build");

        assert_eq!(
            store.read("base_module_001", fields::TEMPERATURE).expect("read"),
            Value::Double(22.5)
        );
        assert_eq!(
            store
                .read("advanced_module_002", fields::SYSTEM_STATE)
                .expect("read"),
            SystemState::Maintenance.as_value()
        );
        assert_eq!(
            store
                .read("advanced_module_001", fields::CROWD_LEVEL)
                .expect("read"),
            Value::Double(35.0)
        );
        assert_eq!(
            store
                .read("base_module_001", fields::ALARM_ACTIVE)
                .expect("read"),
            Value::Boolean(false)
        );
    }

    #[test]
    fn advanced_modules_inherit_both_methods() {
        let config = AppConfig::default();
        let store = VariableStore::new();
        let station = build_station(&config, &store).expect("build");

        let advanced = NodeId::new(1, 1020);
        let method_names: Vec<String> = station
            .space
            .browse(advanced)
            .into_iter()
            .filter(|c| c.node_class == NodeClass::Method)
            .map(|c| c.browse_name)
            .collect();
        assert_eq!(method_names, [methods::SET_ALARM, methods::SET_ALARM_WITH_LEVEL]);

        let base = NodeId::new(1, 1014);
        let method_names: Vec<String> = station
            .space
            .browse(base)
            .into_iter()
            .filter(|c| c.node_class == NodeClass::Method)
            .map(|c| c.browse_name)
            .collect();
        assert_eq!(method_names, [methods::SET_ALARM]);
    }

    #[test]
    fn building_twice_on_one_store_collides() {
        let config = AppConfig::default();
        let store = VariableStore::new();
        build_station(&config, &store).expect("first build");
        assert!(build_station(&config, &store).is_err());
    }
}
