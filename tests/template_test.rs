use anatomy::template::TemplateEngine;
use anatomy::variables::Variables;

fn vars(yaml: &str) -> Variables {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_expand_interpolation() {
    let engine = TemplateEngine::new();
    let result = engine.expand("Hello {{ name }}!", &vars("name: world")).unwrap();
    assert_eq!(result, "Hello world!");
}

#[test]
fn test_expand_nested_attribute() {
    let engine = TemplateEngine::new();
    let variables = vars("PROJECT:\n  name: alpha");
    assert_eq!(engine.expand("{{ PROJECT.name }}", &variables).unwrap(), "alpha");
}

#[test]
fn test_undefined_variable_fails() {
    let engine = TemplateEngine::new();
    assert!(engine.expand("This is {{ name }}.", &Variables::new()).is_err());
}

#[test]
fn test_undefined_attribute_fails() {
    let engine = TemplateEngine::new();
    let variables = vars("PROJECT:\n  name: alpha");
    assert!(engine.expand("{{ PROJECT.missing }}", &variables).is_err());
}

#[test]
fn test_trailing_newline_preserved_once() {
    let engine = TemplateEngine::new();
    assert_eq!(engine.expand("line\n", &Variables::new()).unwrap(), "line\n");
    assert_eq!(engine.expand("line", &Variables::new()).unwrap(), "line");
}

#[test]
fn test_control_tag_lines_leave_no_blanks() {
    let engine = TemplateEngine::new();
    let variables = vars("items:\n  - one\n  - two");
    let template = "{% for item in items %}\n{{ item }}\n{% endfor %}\n";
    assert_eq!(engine.expand(template, &variables).unwrap(), "one\ntwo\n");
}
