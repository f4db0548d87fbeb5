use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{Handle, SerializableHandle};

/// Serializes the children of `node` (not the node itself).
pub fn serialize_children(node: &Handle) -> String {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = node.clone().into();
    if serialize(&mut buf, &serializable, SerializeOpts::default()).is_err() {
        return String::new();
    }

    String::from_utf8_lossy(&buf).into_owned()
}
