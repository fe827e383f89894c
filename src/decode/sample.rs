use super::group::{GroupKey, GroupedValues};

/// Plugin name attached to every emitted sample.
pub const PLUGIN_NAME: &str = "trident";

/// Namespace prefix of every sample type name.
pub const TYPE_PREFIX: &str = "trident_";

/// One finished measurement, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    pub type_name: String,
    /// Space-separated labels, e.g. `"socket 1 extended-set 2"`. May be empty.
    pub instance: String,
    pub epoch: Option<i64>,
    pub interval: Option<u64>,
    /// Group values in slot order; unset slots are kept as `None`.
    pub values: Vec<Option<i64>>,
}

impl MetricSample {
    /// Build a sample from one accumulated group.
    pub fn from_group(
        key: &GroupKey,
        values: GroupedValues,
        epoch: Option<i64>,
        interval: Option<u64>,
    ) -> Self {
        Self {
            type_name: type_name(&key.base_name),
            instance: instance_label(key.socket, key.group_number),
            epoch,
            interval,
            values: values.into_values(),
        }
    }
}

/// Normalize a base metric name into a sample type name.
pub fn type_name(base_name: &str) -> String {
    let mut name = String::with_capacity(TYPE_PREFIX.len() + base_name.len());
    name.push_str(TYPE_PREFIX);
    name.extend(base_name.chars().map(|c| match c {
        ' ' | '(' | ')' | '\\' => '_',
        c => c,
    }));
    name.to_lowercase()
}

/// Build the instance label for a group.
pub fn instance_label(socket: Option<u32>, group_number: u32) -> String {
    let mut label = String::new();
    if let Some(socket) = socket {
        label.push_str(&format!("socket {socket}"));
    }
    if group_number > 0 {
        if !label.is_empty() {
            label.push(' ');
        }
        label.push_str(&format!("extended-set {}", group_number + 1));
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_normalization() {
        assert_eq!(type_name("Read BW (MB/s)"), "trident_read_bw__mb/s_");
        assert_eq!(type_name("Mem\\Util"), "trident_mem_util");
        assert_eq!(type_name(""), "trident_");
    }

    #[test]
    fn test_instance_label() {
        assert_eq!(instance_label(None, 0), "");
        assert_eq!(instance_label(Some(0), 0), "socket 0");
        assert_eq!(instance_label(Some(2), 1), "socket 2 extended-set 2");
        assert_eq!(instance_label(None, 3), "extended-set 4");
    }

    #[test]
    fn test_from_group_keeps_unset_slots() {
        let key = GroupKey {
            base_name: "Write BW".to_string(),
            socket: Some(1),
            group_number: 1,
        };
        let mut values = GroupedValues::new(4);
        values.set(0, 12);

        let sample = MetricSample::from_group(&key, values, Some(1_577_836_800), Some(10));
        assert_eq!(sample.type_name, "trident_write_bw");
        assert_eq!(sample.instance, "socket 1 extended-set 2");
        assert_eq!(sample.values, vec![Some(12), None, None, None]);
        assert_eq!(sample.epoch, Some(1_577_836_800));
        assert_eq!(sample.interval, Some(10));
    }
}
