use serde_json::Value;
use std::borrow::Cow;
use crate::inventory::Provider;

/// Typed fields the analyzers read from a resource's configuration payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    SecurityGroups,
    Vpc,
    Subnet,
    ParameterGroup,
    IamRole,
    NetworkInterfaces,
    InstanceType,
    VpcConfig,
    BlockDevices,
    MetadataTokens,
    Versioning,
    BackupRetention,
    PolicyActions,
    PolicyResources,
    SoftDelete,
}

// Aliases are stored normalized: lowercase, separators stripped.
const AWS_ALIASES: &[(ConfigField, &[&str])] = &[
    (ConfigField::SecurityGroups, &["securitygroups", "securitygroupids", "vpcsecuritygroupids", "vpcsecuritygroups"]),
    (ConfigField::Vpc, &["vpcid", "vpc"]),
    (ConfigField::Subnet, &["subnetid", "subnetids", "subnets", "dbsubnetgroupname", "dbsubnetgroup"]),
    (ConfigField::ParameterGroup, &["dbparametergroupname", "dbparametergroups", "dbclusterparametergroupname", "cacheparametergroupname"]),
    (ConfigField::IamRole, &["iaminstanceprofile", "rolearn", "role", "executionrolearn", "taskrolearn"]),
    (ConfigField::NetworkInterfaces, &["networkinterfaces", "networkinterfaceids", "networkinterfaceid"]),
    (ConfigField::InstanceType, &["instancetype", "dbinstanceclass", "instanceclass", "cachenodetype", "nodetype"]),
    (ConfigField::VpcConfig, &["vpcconfig"]),
    (ConfigField::BlockDevices, &["blockdevicemappings", "ebsblockdevice", "rootblockdevice", "ebs"]),
    (ConfigField::MetadataTokens, &["httptokens"]),
    (ConfigField::Versioning, &["versioningconfiguration", "versioning"]),
    (ConfigField::BackupRetention, &["backupretentionperiod"]),
    (ConfigField::PolicyActions, &["action", "actions"]),
    (ConfigField::PolicyResources, &["resource", "resources"]),
];

const AZURE_ALIASES: &[(ConfigField, &[&str])] = &[
    (ConfigField::SecurityGroups, &["networksecuritygroup", "networksecuritygroupid", "networksecuritygroups"]),
    (ConfigField::Vpc, &["virtualnetwork", "virtualnetworkid", "vnetid", "vnet"]),
    (ConfigField::Subnet, &["subnet", "subnetid", "subnets"]),
    (ConfigField::IamRole, &["identity", "userassignedidentities", "principalid"]),
    (ConfigField::NetworkInterfaces, &["networkinterfaces", "networkinterfaceids"]),
    (ConfigField::InstanceType, &["vmsize", "skuname", "sku", "size"]),
    (ConfigField::Versioning, &["isversioningenabled", "versioning"]),
    (ConfigField::BackupRetention, &["backupretentiondays"]),
    (ConfigField::SoftDelete, &["enablesoftdelete", "softdeleteenabled"]),
];

const GCP_ALIASES: &[(ConfigField, &[&str])] = &[
    (ConfigField::SecurityGroups, &["firewallrules", "firewalls"]),
    (ConfigField::Vpc, &["network", "vpcnetwork"]),
    (ConfigField::Subnet, &["subnetwork", "subnetworks"]),
    (ConfigField::IamRole, &["serviceaccounts", "serviceaccount", "serviceaccountemail"]),
    (ConfigField::NetworkInterfaces, &["networkinterfaces"]),
    (ConfigField::InstanceType, &["machinetype", "tier"]),
    (ConfigField::Versioning, &["versioning"]),
];

// Rule containers whose contents never describe inbound traffic.
const EGRESS_KEYS: &[&str] = &["ippermissionsegress", "egress", "egressrules", "outbound", "outboundrules"];
// Rule containers whose contents describe inbound traffic.
const INGRESS_KEYS: &[&str] = &["ippermissions", "ingress", "ingressrules", "inbound", "inboundrules"];
// Ranges that name a traffic source wherever they appear.
const SOURCE_KEYS: &[&str] = &["sourceaddressprefix", "sourceaddressprefixes", "sourceranges"];
// Ranges that are only sources inside an inbound rule.
const CIDR_KEYS: &[&str] = &["cidrip", "cidripv6", "cidrblocks", "ipv6cidrblocks"];
const EGRESS_WORDS: &[&str] = &["egress", "outbound"];
const INGRESS_WORDS: &[&str] = &["ingress", "inbound"];

impl ConfigField {
    /// Alias sets searched for this field, most specific provider first.
    fn alias_sets(self, provider: &Provider) -> Vec<&'static [&'static str]> {
        let tables: &[&[(ConfigField, &[&str])]] = match provider {
            Provider::Aws => &[AWS_ALIASES],
            Provider::Azure => &[AZURE_ALIASES],
            Provider::Gcp => &[GCP_ALIASES],
            Provider::Other(_) => &[AWS_ALIASES, AZURE_ALIASES, GCP_ALIASES],
        };

        tables
            .iter()
            .flat_map(|table| table.iter())
            .filter(|(field, _)| *field == self)
            .map(|(_, aliases)| *aliases)
            .collect()
    }
}

pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Structured view over a resource's raw configuration blob.
///
/// The blob is parsed as JSON, then as YAML. Anything that is not a mapping
/// or sequence is `Unparsed`, and every accessor on an unparsed view returns
/// the empty/`None` default instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceConfig {
    Structured(Value),
    Unparsed,
}

impl ResourceConfig {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ResourceConfig::Unparsed;
        }

        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            if value.is_object() || value.is_array() {
                return ResourceConfig::Structured(value);
            }
        }

        match serde_yaml::from_str::<Value>(trimmed) {
            Ok(value) if value.is_object() || value.is_array() => ResourceConfig::Structured(value),
            _ => ResourceConfig::Unparsed,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ResourceConfig::Structured(_))
    }

    /// First value stored under any alias of `field`, searching nested
    /// objects breadth-first so shallow keys win.
    pub fn lookup(&self, provider: &Provider, field: ConfigField) -> Option<&Value> {
        self.lookup_all(provider, field).into_iter().next()
    }

    /// Every value stored under any alias of `field`, anywhere in the tree.
    pub fn lookup_all(&self, provider: &Provider, field: ConfigField) -> Vec<&Value> {
        let root = match self {
            ResourceConfig::Structured(value) => value,
            ResourceConfig::Unparsed => return Vec::new(),
        };

        let mut found = Vec::new();
        for aliases in field.alias_sets(provider) {
            collect_matches(root, aliases, &mut found);
            if !found.is_empty() {
                break;
            }
        }
        found
    }

    pub fn has(&self, provider: &Provider, field: ConfigField) -> bool {
        self.lookup_all(provider, field).into_iter().any(|v| !is_blank(v))
    }

    /// String leaves under every occurrence of `field`.
    pub fn strings(&self, provider: &Provider, field: ConfigField) -> Vec<String> {
        let mut out = Vec::new();
        for value in self.lookup_all(provider, field) {
            string_leaves(value, &mut out);
        }
        out.into_iter().map(|s| s.to_string()).collect()
    }

    pub fn text(&self, provider: &Provider, field: ConfigField) -> Option<String> {
        self.strings(provider, field).into_iter().find(|s| !s.trim().is_empty())
    }

    pub fn flag(&self, provider: &Provider, field: ConfigField) -> Option<bool> {
        self.lookup(provider, field).and_then(as_flag)
    }

    pub fn number(&self, provider: &Provider, field: ConfigField) -> Option<f64> {
        match self.lookup(provider, field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Every `encrypted`-style flag beneath `field`. `None` when the field is
    /// absent or carries no such flag.
    pub fn all_encrypted(&self, provider: &Provider, field: ConfigField) -> Option<bool> {
        let mut flags = Vec::new();
        for value in self.lookup_all(provider, field) {
            collect_flags(value, "encrypted", &mut flags);
        }
        if flags.is_empty() {
            None
        } else {
            Some(flags.into_iter().all(|f| f))
        }
    }

    /// Source ranges of inbound rules. Egress containers and rules whose
    /// `direction` (or Terraform `type`) is outbound are skipped.
    ///
    /// For unparsed payloads this returns the stretches of raw text that are
    /// not preceded by an egress/outbound keyword.
    pub fn ingress_sources<'a>(&'a self, raw: &'a str) -> Vec<&'a str> {
        match self {
            ResourceConfig::Structured(value) => {
                let mut out = Vec::new();
                collect_ingress(value, false, &mut out);
                out
            }
            ResourceConfig::Unparsed => inbound_segments(raw),
        }
    }

    /// Every scalar in the payload plus every object key, for literal
    /// identifier matching. For unparsed payloads the raw text is returned
    /// as a single leaf.
    pub fn leaves<'a>(&'a self, raw: &'a str) -> Vec<Cow<'a, str>> {
        match self {
            ResourceConfig::Structured(value) => {
                let mut out = Vec::new();
                scalar_leaves(value, &mut out);
                out
            }
            ResourceConfig::Unparsed if raw.trim().is_empty() => Vec::new(),
            ResourceConfig::Unparsed => vec![Cow::Borrowed(raw)],
        }
    }
}

fn scalar_leaves<'a>(value: &'a Value, out: &mut Vec<Cow<'a, str>>) {
    match value {
        Value::String(s) => out.push(Cow::Borrowed(s.as_str())),
        Value::Number(n) => out.push(Cow::Owned(n.to_string())),
        Value::Array(items) => items.iter().for_each(|v| scalar_leaves(v, out)),
        Value::Object(map) => {
            for (key, child) in map {
                out.push(Cow::Borrowed(key.as_str()));
                scalar_leaves(child, out);
            }
        }
        _ => {}
    }
}

/// `Some(true)` for an inbound rule, `Some(false)` for an outbound one.
fn rule_direction(map: &serde_json::Map<String, Value>) -> Option<bool> {
    map.iter()
        .filter(|(key, _)| matches!(normalize_key(key).as_str(), "direction" | "type"))
        .find_map(|(_, value)| match value.as_str()?.trim().to_ascii_lowercase().as_str() {
            "ingress" | "inbound" => Some(true),
            "egress" | "outbound" => Some(false),
            _ => None,
        })
}

fn collect_ingress<'a>(value: &'a Value, inbound: bool, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            let inbound = match rule_direction(map) {
                Some(false) => return,
                Some(true) => true,
                None => inbound,
            };
            for (key, child) in map {
                let key = normalize_key(key);
                if EGRESS_KEYS.contains(&key.as_str()) {
                    continue;
                }
                if SOURCE_KEYS.contains(&key.as_str()) || (inbound && CIDR_KEYS.contains(&key.as_str())) {
                    string_leaves(child, out);
                } else {
                    collect_ingress(child, inbound || INGRESS_KEYS.contains(&key.as_str()), out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_ingress(v, inbound, out)),
        _ => {}
    }
}

fn inbound_segments(raw: &str) -> Vec<&str> {
    // ASCII lowercasing keeps byte offsets valid for `raw`.
    let lower = raw.to_ascii_lowercase();
    let mut marks: Vec<(usize, bool)> = Vec::new();
    for word in EGRESS_WORDS {
        marks.extend(lower.match_indices(word).map(|(at, _)| (at, false)));
    }
    for word in INGRESS_WORDS {
        marks.extend(lower.match_indices(word).map(|(at, _)| (at, true)));
    }
    marks.sort_unstable();
    marks.push((raw.len(), true));

    let mut segments = Vec::new();
    let mut start = 0;
    let mut inbound = true;
    for (at, next) in marks {
        if inbound && at > start {
            segments.push(&raw[start..at]);
        }
        start = at;
        inbound = next;
    }
    segments
}

fn collect_matches<'a>(value: &'a Value, aliases: &[&str], found: &mut Vec<&'a Value>) {
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(value);

    while let Some(current) = queue.pop_front() {
        match current {
            Value::Object(map) => {
                for (key, child) in map {
                    if aliases.contains(&normalize_key(key).as_str()) {
                        found.push(child);
                    } else {
                        queue.push_back(child);
                    }
                }
            }
            Value::Array(items) => queue.extend(items.iter()),
            _ => {}
        }
    }
}

fn string_leaves<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s.as_str()),
        Value::Array(items) => items.iter().for_each(|v| string_leaves(v, out)),
        Value::Object(map) => map.values().for_each(|v| string_leaves(v, out)),
        _ => {}
    }
}

fn collect_flags(value: &Value, key: &str, flags: &mut Vec<bool>) {
    match value {
        Value::Object(map) => {
            for (k, child) in map {
                if normalize_key(k) == key {
                    if let Some(flag) = as_flag(child) {
                        flags.push(flag);
                        continue;
                    }
                }
                collect_flags(child, key, flags);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_flags(v, key, flags)),
        _ => {}
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "enabled" | "on" | "yes" | "required" => Some(true),
            "false" | "disabled" | "off" | "no" | "suspended" | "optional" => Some(false),
            _ => None,
        },
        Value::Object(map) => map
            .iter()
            .find(|(k, _)| matches!(normalize_key(k).as_str(), "status" | "enabled"))
            .and_then(|(_, v)| as_flag(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_yaml_and_garbage() {
        assert!(ResourceConfig::parse(r#"{"InstanceType": "t3.micro"}"#).is_structured());
        assert!(ResourceConfig::parse("InstanceType: t3.micro\nVpcId: vpc-1\n").is_structured());
        assert_eq!(ResourceConfig::parse("instance t3.micro in vpc-1"), ResourceConfig::Unparsed);
        assert_eq!(ResourceConfig::parse("   "), ResourceConfig::Unparsed);
    }

    #[test]
    fn test_lookup_is_case_and_separator_insensitive() {
        let config = ResourceConfig::parse(r#"{"instance_type": "m5.large", "VpcId": "vpc-9"}"#);
        assert_eq!(config.text(&Provider::Aws, ConfigField::InstanceType).as_deref(), Some("m5.large"));
        assert_eq!(config.text(&Provider::Aws, ConfigField::Vpc).as_deref(), Some("vpc-9"));
        assert!(!config.has(&Provider::Aws, ConfigField::Subnet));
    }

    #[test]
    fn test_nested_references_are_collected() {
        let config = ResourceConfig::parse(
            r#"{
                "NetworkInterfaces": [
                    {"NetworkInterfaceId": "eni-1", "Groups": [{"GroupId": "sg-1"}]}
                ],
                "VpcConfig": {"SecurityGroupIds": ["sg-2", "sg-3"], "SubnetIds": ["subnet-1"]}
            }"#,
        );
        assert_eq!(config.strings(&Provider::Aws, ConfigField::SecurityGroups), vec!["sg-2", "sg-3"]);
        assert_eq!(config.strings(&Provider::Aws, ConfigField::Subnet), vec!["subnet-1"]);
        assert!(config.has(&Provider::Aws, ConfigField::NetworkInterfaces));
    }

    #[test]
    fn test_flags_and_numbers() {
        let config = ResourceConfig::parse(
            r#"{
                "VersioningConfiguration": {"Status": "Suspended"},
                "BackupRetentionPeriod": "0",
                "BlockDeviceMappings": [
                    {"Ebs": {"Encrypted": true}},
                    {"Ebs": {"Encrypted": false}}
                ]
            }"#,
        );
        assert_eq!(config.flag(&Provider::Aws, ConfigField::Versioning), Some(false));
        assert_eq!(config.number(&Provider::Aws, ConfigField::BackupRetention), Some(0.0));
        assert_eq!(config.all_encrypted(&Provider::Aws, ConfigField::BlockDevices), Some(false));
    }

    #[test]
    fn test_unparsed_falls_back_to_defaults() {
        let config = ResourceConfig::parse("SecurityGroups=sg-1");
        assert!(!config.has(&Provider::Aws, ConfigField::SecurityGroups));
        assert_eq!(config.text(&Provider::Aws, ConfigField::InstanceType), None);
        assert_eq!(config.leaves("SecurityGroups=sg-1"), vec!["SecurityGroups=sg-1"]);
    }

    #[test]
    fn test_leaves_include_numbers_and_keys() {
        let raw = r#"{"target": 4611686018427387904, "routes": {"vm-7": true}}"#;
        let config = ResourceConfig::parse(raw);
        let leaves = config.leaves(raw);
        assert!(leaves.iter().any(|l| l == "4611686018427387904"));
        assert!(leaves.iter().any(|l| l == "vm-7"));
        assert!(leaves.iter().any(|l| l == "target"));
    }

    #[test]
    fn test_ingress_sources_skip_egress_rules() {
        let raw = r#"{
            "IpPermissions": [{"IpRanges": [{"CidrIp": "10.0.0.0/8"}]}],
            "IpPermissionsEgress": [{"IpRanges": [{"CidrIp": "0.0.0.0/0"}]}]
        }"#;
        let config = ResourceConfig::parse(raw);
        assert_eq!(config.ingress_sources(raw), vec!["10.0.0.0/8"]);

        let terraform = "ingress:\n  - cidr_blocks: ['10.1.0.0/16']\negress:\n  - cidr_blocks: ['0.0.0.0/0']\n";
        let config = ResourceConfig::parse(terraform);
        assert_eq!(config.ingress_sources(terraform), vec!["10.1.0.0/16"]);
    }

    #[test]
    fn test_ingress_sources_follow_rule_direction() {
        let raw = r#"{"securityRules": [
            {"properties": {"direction": "Outbound", "sourceAddressPrefix": "0.0.0.0/0"}},
            {"properties": {"direction": "Inbound", "sourceAddressPrefix": "192.168.0.0/16"}}
        ]}"#;
        let config = ResourceConfig::parse(raw);
        assert_eq!(config.ingress_sources(raw), vec!["192.168.0.0/16"]);

        let firewall = r#"{"direction": "EGRESS", "destinationRanges": ["0.0.0.0/0"], "sourceRanges": ["0.0.0.0/0"]}"#;
        assert!(ResourceConfig::parse(firewall).ingress_sources(firewall).is_empty());

        // A bare CIDR outside any rule container is not a source.
        let bare = r#"{"CidrIp": "0.0.0.0/0"}"#;
        assert!(ResourceConfig::parse(bare).ingress_sources(bare).is_empty());
    }

    #[test]
    fn test_unparsed_ingress_sources_drop_egress_text() {
        let raw = "allow 10.0.0.0/8 port 22; egress to 0.0.0.0/0";
        let config = ResourceConfig::parse(raw);
        assert_eq!(config.ingress_sources(raw), vec!["allow 10.0.0.0/8 port 22; "]);
    }
}
