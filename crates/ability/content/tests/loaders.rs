//! Loading a data directory end to end and running what it describes.

use std::fs;
use std::path::Path;

use ability_content::{ConfigLoader, ContentFactory, GraphLoader};
use ability_core::{
    AbilityEnv, AbilityRuntime, AbilitySystemComponent, ActivationRequest, AttributeKind,
    Attributes, GateRejection, GraphCatalog, GraphOracle, SkillId, UnitId,
};
use tempfile::TempDir;

const CASTER: UnitId = UnitId(1);
const ENEMY: UnitId = UnitId(2);
const FIREBALL: SkillId = SkillId(200);

const CONFIG: &str = r#"
fps = 60
max_execution_depth = 16
"#;

const MAGE: &str = r#"
AbilityCatalog(
    abilities: [
        (
            skill: SkillId(200),
            nodes: [
                (
                    guid: "root",
                    kind: Ability((
                        id: SkillId(200),
                        name: "Fireball",
                        tags: (
                            asset: ["Ability.Spell.Fire"],
                            activation_blocked: ["State.Silenced"],
                        ),
                        cooldown: Some(Normal(duration: 1.5, tag: "Cooldown.Fireball")),
                        cost: Some((attribute: Mana, amount: FixedValue(10.0))),
                    )),
                ),
                (
                    guid: "burst",
                    kind: Effect((
                        kind: Damage(amount: Formula("Caster.Attack * 2")),
                        target: MainTarget,
                    )),
                ),
                (
                    guid: "text",
                    kind: Cue((
                        kind: FloatingText,
                        asset: "txt_damage",
                        text: Some(Formula("Caster.Attack * 2")),
                        attach_to: MainTarget,
                    )),
                ),
            ],
            connections: [
                (output_node: "root", output_port: "Out", input_node: "burst"),
                (output_node: "burst", output_port: "OnApply", input_node: "text"),
            ],
        ),
    ],
)
"#;

const BROKEN: &str = r#"
AbilityCatalog(
    abilities: [
        (
            skill: SkillId(300),
            nodes: [
                (guid: "a", kind: Ability((id: SkillId(300), name: "One"))),
                (guid: "b", kind: Ability((id: SkillId(300), name: "Two"))),
            ],
        ),
    ],
)
"#;

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    fs::write(path, content).expect("write content file");
}

fn mage(unit: UnitId) -> AbilitySystemComponent {
    AbilitySystemComponent::new(unit).with_attributes(Attributes::from_values([
        (AttributeKind::MaxHealth, 100.0),
        (AttributeKind::Health, 100.0),
        (AttributeKind::Mana, 25.0),
        (AttributeKind::Attack, 15.0),
    ]))
}

#[test]
fn test_factory_loads_config_and_graphs() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "config.toml", CONFIG);
    write(dir.path(), "abilities/mage.ron", MAGE);
    write(dir.path(), "abilities/notes.txt", "not content");

    let factory = ContentFactory::new(dir.path());
    let config = factory.load_config().expect("config");
    assert_eq!(config.fps, 60);
    assert_eq!(config.max_execution_depth, 16);

    let graphs = factory.load_graphs().expect("graphs");
    assert_eq!(graphs.len(), 1);
    let graph = graphs.ability_graph(FIREBALL).expect("fireball graph");
    assert_eq!(graph.root().map(|root| root.name.as_str()), Some("Fireball"));
    assert_eq!(graph.dangling_connections(), 0);
}

#[test]
fn test_loaded_ability_runs_against_runtime() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "config.toml", CONFIG);
    write(dir.path(), "abilities/mage.ron", MAGE);

    let factory = ContentFactory::new(dir.path());
    let graphs = factory.load_graphs().expect("graphs");
    let env = AbilityEnv::new(&graphs);
    let mut runtime = AbilityRuntime::new(factory.load_config().expect("config"));
    runtime.add_unit(mage(CASTER));
    runtime.add_unit(mage(ENEMY));
    runtime.grant_ability(CASTER, FIREBALL, 1);

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, FIREBALL).with_target(ENEMY))
        .expect("first cast");
    let caster = runtime.unit(CASTER).expect("caster");
    assert_eq!(caster.attributes().get_current_value(AttributeKind::Mana), Some(15.0));
    let enemy = runtime.unit(ENEMY).expect("enemy");
    assert_eq!(enemy.attributes().get_current_value(AttributeKind::Health), Some(70.0));

    // 1.5 seconds at 60 fps.
    assert_eq!(runtime.remaining_cooldown(CASTER, FIREBALL), 90);
    runtime.end_ability(env, CASTER, FIREBALL);
    let rejected = runtime
        .activate_ability(env, ActivationRequest::new(CASTER, FIREBALL).with_target(ENEMY))
        .expect_err("on cooldown");
    assert!(matches!(
        rejected.gate(),
        Some(GateRejection::OnCooldown { .. })
    ));
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let factory = ContentFactory::new(dir.path());
    assert_eq!(
        factory.load_config().expect("default config"),
        ability_core::RuntimeConfig::default()
    );
}

#[test]
fn test_missing_abilities_dir_is_an_error() {
    let dir = TempDir::new().expect("temp dir");
    let factory = ContentFactory::new(dir.path());
    let error = factory.load_graphs().expect_err("no abilities dir");
    assert!(error.to_string().contains("Failed to read directory"));
}

#[test]
fn test_invalid_graph_rejects_whole_file() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "abilities/broken.ron", BROKEN);

    let path = dir.path().join("abilities/broken.ron");
    let mut catalog = GraphCatalog::new();
    let error = GraphLoader::load_into(&path, &mut catalog).expect_err("two roots");

    let message = error.to_string();
    assert!(message.contains("broken.ron"));
    assert!(message.contains("GRAPH_MULTIPLE_ROOTS"));
    assert!(catalog.is_empty());
}

#[test]
fn test_skill_defined_in_two_files_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "abilities/a.ron", MAGE);
    write(dir.path(), "abilities/b.ron", MAGE);

    let error = GraphLoader::load_dir(&dir.path().join("abilities")).expect_err("duplicate");
    let message = error.to_string();
    assert!(message.contains("b.ron"));
    assert!(message.contains("more than once"));
}

#[test]
fn test_malformed_files_report_their_path() {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "config.toml", "fps = \"fast\"");
    write(dir.path(), "abilities/typo.ron", "AbilityCatalog(abilites: [])");

    let config = ConfigLoader::load(&dir.path().join("config.toml")).expect_err("bad toml");
    assert!(config.to_string().contains("config.toml"));

    let graphs = GraphLoader::load(&dir.path().join("abilities/typo.ron")).expect_err("bad ron");
    assert!(graphs.to_string().contains("typo.ron"));
}
