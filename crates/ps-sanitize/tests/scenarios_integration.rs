//! End-to-end sanitization scenarios.
//!
//! Each test runs the full public pipeline (policy → sanitizer → output)
//! on a small business record and checks the exact emitted tree.

use ps_sanitize::{
    AllowListPrecedence, ArrayTruncation, DenyAction, Node, Preset, SanitizePolicy, Sanitizer,
    DEPTH_LIMIT_MARKER,
};

fn sanitizer_with(mut policy: SanitizePolicy, allow: &[&str]) -> Sanitizer {
    policy.crypto.enabled = false;
    policy.allow_paths = allow.iter().map(|s| s.to_string()).collect();
    Sanitizer::with_passphrase(policy, None).unwrap()
}

fn sanitize(s: &Sanitizer, json: &str) -> Node {
    s.sanitize(&Node::from_json_str(json).unwrap()).into_value()
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_allow_listed_message_has_cpf_masked() {
    let s = sanitizer_with(Preset::DeleteOnDeny.policy(), &["mensagem"]);
    let out = sanitize(&s, r#"{"mensagem":"CPF:14028002664"}"#);
    assert_eq!(out.to_json_string(), r#"{"mensagem":"CPF:***********"}"#);
}

#[test]
fn test_binary_marker_removes_allow_listed_pdf() {
    let s = sanitizer_with(Preset::DeleteOnDeny.policy(), &["DES_RETORNO"]);
    let input = format!(r#"{{"DES_RETORNO":"JVBERi0x{}"}}"#, "A".repeat(2100));
    let output = s.sanitize(&Node::from_json_str(&input).unwrap());

    assert!(output.is_absent());
    assert_eq!(output.stats.binary, 1);
    assert_eq!(output.into_value().to_json_string(), "{}");
}

#[test]
fn test_service_url_keeps_only_safe_query_params() {
    let s = sanitizer_with(Preset::DeleteOnDeny.policy(), &["URL_SERVICO"]);
    let out = sanitize(&s, r#"{"URL_SERVICO":"https://x/api?Cpf=14028002664&foo=bar"}"#);

    let url = out.get("URL_SERVICO").unwrap().as_str().unwrap();
    assert!(url.contains("foo=bar"));
    assert!(!url.contains("Cpf"));
    assert!(!url.contains("14028002664"));
}

#[test]
fn test_depth_two_replaces_third_level() {
    let mut policy = Preset::NoiseStrip.policy();
    policy.limits.max_depth = 2;
    let s = sanitizer_with(policy, &[]);

    let out = sanitize(&s, r#"{"nivel1":{"nivel2":{"nivel3":"valor"}},"raiz":"ok"}"#);
    let level2 = out.get("nivel1").unwrap().get("nivel2").unwrap();
    assert_eq!(level2.get("nivel3").unwrap().as_str(), Some(DEPTH_LIMIT_MARKER));
    assert_eq!(out.get("raiz").unwrap().as_str(), Some("ok"));
}

#[test]
fn test_five_hundred_items_wrapped_with_metadata() {
    let s = sanitizer_with(Preset::DeleteOnDeny.policy(), &["historico"]);
    let items: Vec<String> = (0..500).map(|i| format!(r#""evento {}""#, i)).collect();
    let input = format!(r#"{{"historico":[{}]}}"#, items.join(","));
    let out = sanitize(&s, &input);

    let wrapper = out.get("historico").unwrap();
    let meta = wrapper.get("meta").unwrap();
    assert_eq!(meta.get("arrayTruncated"), Some(&Node::Bool(true)));
    assert_eq!(meta.get("originalLength"), Some(&Node::from(500u64)));
    assert_eq!(meta.get("kept"), Some(&Node::from(50u64)));

    let kept = wrapper.get("items").unwrap().as_sequence().unwrap();
    assert_eq!(kept.len(), 50);
    assert_eq!(kept[0].as_str(), Some("evento 0"));
    assert_eq!(kept[49].as_str(), Some("evento 49"));
}

// ============================================================================
// Policy variants
// ============================================================================

#[test]
fn test_same_record_under_each_preset() {
    let record = r#"{"pedido":{"id":42,"obs":"cliente 140.280.026-64"},"senha":"x"}"#;

    let delete = sanitizer_with(Preset::DeleteOnDeny.policy(), &["pedido.obs"]);
    assert_eq!(
        sanitize(&delete, record).to_json_string(),
        r#"{"pedido":{"obs":"cliente **************"}}"#
    );

    let noise = sanitizer_with(Preset::NoiseStrip.policy(), &[]);
    assert_eq!(
        sanitize(&noise, record).to_json_string(),
        r#"{"pedido":{"id":42,"obs":"cliente **************"}}"#
    );

    let encrypt = sanitizer_with(Preset::AllowEncrypt.policy(), &["pedido.obs"]);
    assert_eq!(
        sanitize(&encrypt, record).to_json_string(),
        r#"{"pedido":{"id":"id:REDACTED","obs":"cliente 140.280.026-64"}}"#
    );
}

#[test]
fn test_mask_allow_listed_flag() {
    let record = r#"{"obs":"cpf 14028002664"}"#;

    let mut policy = Preset::AllowEncrypt.policy();
    policy.mask_allow_listed = true;
    let s = sanitizer_with(policy, &["obs"]);
    assert_eq!(sanitize(&s, record).to_json_string(), r#"{"obs":"cpf ***********"}"#);

    let mut policy = Preset::DeleteOnDeny.policy();
    policy.mask_allow_listed = false;
    let s = sanitizer_with(policy, &["obs"]);
    assert_eq!(sanitize(&s, record).to_json_string(), record);
}

#[test]
fn test_absolute_precedence_skips_name_markers() {
    let mut policy = Preset::DeleteOnDeny.policy();
    policy.allow_list_precedence = AllowListPrecedence::Absolute;
    policy.mask_allow_listed = false;
    let s = sanitizer_with(policy, &["cliente.cpf"]);

    let out = sanitize(&s, r#"{"cliente":{"cpf":"14028002664","senha":"x"}}"#);
    assert_eq!(out.to_json_string(), r#"{"cliente":{"cpf":"14028002664"}}"#);
}

#[test]
fn test_heuristics_first_drops_sensitive_name_even_if_allow_listed() {
    let s = sanitizer_with(Preset::DeleteOnDeny.policy(), &["cliente.cpf", "cliente.nome"]);
    let out = sanitize(&s, r#"{"cliente":{"cpf":"14028002664","nome":"Ana"}}"#);
    assert_eq!(out.to_json_string(), r#"{"cliente":{"nome":"Ana"}}"#);
}

#[test]
fn test_allow_list_matches_normalized_key_spellings() {
    let s = sanitizer_with(Preset::DeleteOnDeny.policy(), &["Dados_Pedido.Itens[].Descrição"]);
    let out = sanitize(
        &s,
        r#"{"dadosPedido":{"itens":[{"descricao":"caneta","preco":2},{"DESCRICAO":"lapis"}]}}"#,
    );
    assert_eq!(
        out.to_json_string(),
        r#"{"dadosPedido":{"itens":[{"descricao":"caneta"},{"DESCRICAO":"lapis"}]}}"#
    );
}

#[test]
fn test_keep_and_drop_paths_before_sanitizing() {
    let mut policy = Preset::NoiseStrip.policy();
    policy.keep_paths = vec!["pedido".to_string()];
    policy.drop_paths = vec!["pedido.debug".to_string()];
    let s = sanitizer_with(policy, &[]);

    let output = s.sanitize(
        &Node::from_json_str(r#"{"pedido":{"id":1,"debug":{"trace":"x"}},"auditoria":{"ip":"1"}}"#)
            .unwrap(),
    );
    assert_eq!(output.stats.pruned_by_keep, 1);
    assert_eq!(output.stats.dropped_paths, 1);
    assert_eq!(output.into_value().to_json_string(), r#"{"pedido":{"id":1}}"#);
}

#[test]
fn test_slice_truncation_for_mask_policy() {
    let mut policy = Preset::NoiseStrip.policy();
    policy.deny_action = DenyAction::Mask;
    policy.array_truncation = ArrayTruncation::Slice;
    policy.limits.max_array_items = 3;
    let s = sanitizer_with(policy, &[]);

    let out = sanitize(&s, r#"{"l":[1,2,3,4,5]}"#);
    assert_eq!(out.to_json_string(), r#"{"l":[1,2,3]}"#);
}

#[test]
fn test_shape_applies_byte_budget_after_sanitizing() {
    let mut policy = Preset::NoiseStrip.policy();
    policy.limits.max_payload_bytes = 200;
    let s = sanitizer_with(policy, &[]);

    let logs: Vec<String> = (0..40).map(|i| format!(r#""linha de log {}""#, i)).collect();
    let input = format!(r#"{{"resumo":"ok","logs":[{}]}}"#, logs.join(","));
    let shaped = s.shape(&Node::from_json_str(&input).unwrap());

    assert!(!shaped.budget.exceeded);
    assert_eq!(shaped.budget.arrays_zeroed, 1);
    assert!(shaped.value.serialized_len() <= 200);
    assert_eq!(shaped.value.get("resumo").unwrap().as_str(), Some("ok"));
    assert!(shaped.stats.is_consistent());
}

#[test]
fn test_input_is_never_mutated() {
    let s = sanitizer_with(Preset::NoiseStrip.policy(), &[]);
    let input = Node::from_json_str(r#"{"senha":"x","obs":"cpf 14028002664"}"#).unwrap();
    let before = input.clone();
    let _ = s.sanitize(&input);
    assert_eq!(input, before);
}

#[test]
fn test_key_order_is_preserved() {
    let s = sanitizer_with(Preset::NoiseStrip.policy(), &[]);
    let out = sanitize(&s, r#"{"zeta":1,"alfa":2,"meio":3}"#);
    assert_eq!(out.to_json_string(), r#"{"zeta":1,"alfa":2,"meio":3}"#);
}
