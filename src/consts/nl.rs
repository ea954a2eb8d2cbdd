//! Constants for the top level netlink header and socket setup.

impl_trait!(
    /// Marker trait for types usable in the `nl_type` field of
    /// [`Nlmsghdr`][crate::nl::Nlmsghdr]. Dynamically resolved generic
    /// family IDs are plain `u16`s, which is why the raw integer
    /// implements this trait as well.
    NlType,
    u16
);

impl_var_trait!(
    /// Values for `nl_type` in [`Nlmsghdr`][crate::nl::Nlmsghdr] when
    /// talking to the generic netlink controller
    GenlId,
    u16,
    NlType,
    Ctrl => libc::GENL_ID_CTRL as u16
);

impl_var_trait!(
    /// Values for `nl_type` in [`Nlmsghdr`][crate::nl::Nlmsghdr]
    /// reserved for netlink control messages
    Nlmsg,
    u16,
    NlType,
    Noop => libc::NLMSG_NOOP as u16,
    Error => libc::NLMSG_ERROR as u16,
    Done => libc::NLMSG_DONE as u16,
    Overrun => libc::NLMSG_OVERRUN as u16
);

impl_var!(
    /// Address families for `socket()`
    AddrFamily,
    libc::c_int,
    Netlink => libc::AF_NETLINK
);

impl_var!(
    /// Netlink protocols for `socket()`
    NlFamily,
    libc::c_int,
    Generic => libc::NETLINK_GENERIC
);

impl_flags!(
    /// Values for `nl_flags` in [`Nlmsghdr`][crate::nl::Nlmsghdr]
    NlmF,
    u16,
    /// This message is a request.
    REQUEST => libc::NLM_F_REQUEST as u16,
    /// Part of a multipart message terminated by a `Done` message.
    MULTI => libc::NLM_F_MULTI as u16,
    /// Request an acknowledgement on success.
    ACK => libc::NLM_F_ACK as u16,
    /// Echo this request back.
    ECHO => libc::NLM_F_ECHO as u16,
    /// Return the complete table instead of a single entry.
    ROOT => libc::NLM_F_ROOT as u16,
    /// Return all entries matching the criteria in the message.
    MATCH => libc::NLM_F_MATCH as u16,
    /// Return an atomic snapshot of the table.
    ATOMIC => libc::NLM_F_ATOMIC as u16,
    /// Combination of `ROOT` and `MATCH`.
    DUMP => libc::NLM_F_DUMP as u16,
);
