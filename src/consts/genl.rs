//! Constants for generic netlink control messages, used to resolve a
//! family name into its dynamically assigned numeric ID.

impl_trait!(
    /// Marker trait for types usable as the command field of
    /// [`Genlmsghdr`][crate::genl::Genlmsghdr]
    Cmd,
    u8
);

impl_trait!(
    /// Marker trait for types usable as the attribute type field of
    /// [`Nlattr`][crate::nlattr::Nlattr]
    NlAttrType,
    u16
);

impl_var_trait!(
    /// Generic netlink controller commands
    CtrlCmd,
    u8,
    Cmd,
    Unspec => libc::CTRL_CMD_UNSPEC as u8,
    Newfamily => libc::CTRL_CMD_NEWFAMILY as u8,
    Delfamily => libc::CTRL_CMD_DELFAMILY as u8,
    Getfamily => libc::CTRL_CMD_GETFAMILY as u8
);

impl_var_trait!(
    /// Generic netlink controller attributes
    CtrlAttr,
    u16,
    NlAttrType,
    Unspec => libc::CTRL_ATTR_UNSPEC as u16,
    FamilyId => libc::CTRL_ATTR_FAMILY_ID as u16,
    FamilyName => libc::CTRL_ATTR_FAMILY_NAME as u16,
    Version => libc::CTRL_ATTR_VERSION as u16,
    HdrSize => libc::CTRL_ATTR_HDRSIZE as u16,
    MaxAttr => libc::CTRL_ATTR_MAXATTR as u16,
    Ops => libc::CTRL_ATTR_OPS as u16,
    McastGroups => libc::CTRL_ATTR_MCAST_GROUPS as u16
);

/// Protocol version carried in the generic netlink header of control
/// requests.
pub const CTRL_VERSION: u8 = 2;
